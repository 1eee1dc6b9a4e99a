//! Chat application module for session-bounded conversations.
//!
//! This module provides a streaming chat loop built on top of the
//! seekchat client library. It supports:
//!
//! - Streaming responses with real-time display
//! - A per-session message cap and per-message word limit
//! - An optional system instruction and opening message restored on reset
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing, configuration, and credential loading
//! - [`session`]: the conversation log and its session
//! - [`controller`]: turn-taking, limits, streaming, and error recovery
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod controller;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, ChatInput, help_text, parse_command, parse_input};
pub use config::{
    ChatArgs, ChatConfig, DEFAULT_MESSAGE_CAP, FEEDBACK_SYSTEM_PROMPT, PARAPHRASING_TASK,
    SECRET_KEY_NAME, load_api_key,
};
pub use controller::{
    APOLOGY, ChatController, ControllerState, LIMIT_REACHED_NOTICE, LimitNotice, TurnOutcome,
    describe_error,
};
pub use session::{ConversationLog, Session, SessionId, SessionStats};
