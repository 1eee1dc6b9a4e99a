//! The conversation controller.
//!
//! [`ChatController`] drives one turn at a time: it enforces the message cap and word limit,
//! sends the log to a [`ChatCompletions`] backend, streams the reply into a [`Renderer`], and
//! records the finished reply (or an apology) in the [`Session`].

use std::time::Instant;

use futures::StreamExt;

use crate::chat::config::ChatConfig;
use crate::chat::session::Session;
use crate::client::ChatCompletions;
use crate::error::{Error, Result};
use crate::observability::{
    CHAT_APOLOGIES, CHAT_REJECTED_TURNS, CHAT_REPLY_TRUNCATIONS, CHAT_RESETS, CHAT_TURN_DURATION,
    CHAT_TURNS, CHAT_USER_TRUNCATIONS,
};
use crate::render::Renderer;
use crate::text::{strip_formatting_markers, truncate_to_word_limit};
use crate::types::{ChatCompletionRequest, ChatMessage};

/// Recorded as the assistant's turn whenever a request or its stream fails.
pub const APOLOGY: &str = "Sorry, I encountered an error trying to generate a response.";

/// Shown instead of the input once the conversation is full.
pub const LIMIT_REACHED_NOTICE: &str =
    "This conversation has reached its message limit. Please reset to continue chatting.";

/// Whether the controller will take another submission for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Another exchange fits under the cap.
    AwaitingInput,
    /// The cap is reached; only a reset is accepted.
    Full,
}

/// A notice about how close a session is to its cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitNotice {
    /// Only a few exchanges remain.
    ExchangesLeft(usize),
    /// No exchange fits; the session must be reset.
    CapReached {
        /// Messages stored when the cap was hit.
        count: usize,
        /// The configured cap.
        cap: usize,
    },
}

impl LimitNotice {
    /// The user-facing text of the notice.
    pub fn message(&self) -> String {
        match self {
            LimitNotice::ExchangesLeft(n) => {
                format!("You have {n} exchanges left in this conversation.")
            }
            LimitNotice::CapReached { count, cap } if count >= cap => {
                format!("You've reached the maximum of {cap} messages in this conversation.")
            }
            LimitNotice::CapReached { count, cap } => format!(
                "This conversation holds {count} of {cap} messages, which leaves no room for another exchange."
            ),
        }
    }
}

/// What became of a submission.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The reply streamed to completion and was recorded.
    Completed {
        /// The recorded reply: truncated to the word limit and stripped of formatting markers.
        reply: String,
        /// True when the reply was cut at the word limit.
        truncated: bool,
    },
    /// The request or stream failed; an apology was recorded in place of the reply.
    Apologized {
        /// The failure, as shown to the user.
        error: Error,
    },
    /// The session was full; nothing was sent or recorded.
    Rejected,
}

impl TurnOutcome {
    /// Returns true if the turn completed normally.
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed { .. })
    }
}

/// Drives conversations against a completion backend.
///
/// The controller holds configuration only.  Conversation state lives in the [`Session`] passed
/// to each call, so one controller can serve any number of sessions.
pub struct ChatController<C: ChatCompletions> {
    client: C,
    config: ChatConfig,
}

impl<C: ChatCompletions> ChatController<C> {
    /// Creates a controller for `client` with `config`.
    pub fn new(client: C, config: ChatConfig) -> Self {
        Self { client, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The completion backend.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Starts a session seeded according to the configuration.
    pub fn new_session(&self) -> Session {
        Session::new(self.config.seed_message.clone())
    }

    /// Exchanges (a user message plus its reply) that still fit under the cap.
    pub fn exchanges_left(&self, session: &Session) -> usize {
        self.config.message_cap.saturating_sub(session.count()) / 2
    }

    /// Whether `session` can take another submission.
    pub fn state(&self, session: &Session) -> ControllerState {
        if self.exchanges_left(session) == 0 {
            ControllerState::Full
        } else {
            ControllerState::AwaitingInput
        }
    }

    /// The notice to show before prompting, if any.
    pub fn limit_notice(&self, session: &Session) -> Option<LimitNotice> {
        match self.exchanges_left(session) {
            0 => Some(self.cap_reached(session)),
            n @ 1..=3 => Some(LimitNotice::ExchangesLeft(n)),
            _ => None,
        }
    }

    fn cap_reached(&self, session: &Session) -> LimitNotice {
        LimitNotice::CapReached {
            count: session.count(),
            cap: self.config.message_cap,
        }
    }

    /// Replays the conversation through `renderer`, restoring the seed if the log is empty.
    pub fn render_history(&self, session: &mut Session, renderer: &mut dyn Renderer) {
        session.ensure_seeded();
        for message in session.log().messages() {
            renderer.print_message(message);
        }
    }

    /// Clears the conversation and restores the seed.
    pub fn reset(&self, session: &mut Session, renderer: &mut dyn Renderer) {
        CHAT_RESETS.click();
        session.reset();
        renderer.print_info("Conversation reset.");
    }

    /// Runs one turn for `input`.
    ///
    /// Input over the word limit is truncated with a notice.  Failures never escape: they are
    /// shown through `renderer` and recorded as [`APOLOGY`].
    pub async fn submit(
        &self,
        session: &mut Session,
        input: &str,
        renderer: &mut dyn Renderer,
    ) -> TurnOutcome {
        if self.state(session) == ControllerState::Full {
            CHAT_REJECTED_TURNS.click();
            session.stats_mut().rejected += 1;
            renderer.print_error(&self.cap_reached(session).message());
            renderer.print_info(LIMIT_REACHED_NOTICE);
            return TurnOutcome::Rejected;
        }
        let start = Instant::now();
        let limit = self.config.word_limit;

        let prompt = truncate_to_word_limit(input, limit);
        if prompt != input {
            CHAT_USER_TRUNCATIONS.click();
            session.stats_mut().user_truncations += 1;
            renderer.print_info(&format!("Your message was truncated to {limit} words."));
        }
        session.log_mut().push(ChatMessage::user(prompt));

        let request = ChatCompletionRequest::new(
            self.config.model.clone(),
            self.config.system_prompt.as_deref(),
            session.log().messages(),
        )
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature);
        CHAT_TURNS.click();
        session.stats_mut().turns += 1;

        renderer.start_reply();
        let outcome = match self.stream_reply(request, renderer).await {
            Ok(raw) => {
                let truncated_text = truncate_to_word_limit(&raw, limit);
                let truncated = truncated_text != raw;
                let reply = strip_formatting_markers(&truncated_text);
                renderer.finish_reply(&reply);
                if truncated {
                    CHAT_REPLY_TRUNCATIONS.click();
                    session.stats_mut().reply_truncations += 1;
                    renderer.print_info(&format!("The response was truncated to {limit} words."));
                }
                session.log_mut().push(ChatMessage::assistant(reply.clone()));
                TurnOutcome::Completed { reply, truncated }
            }
            Err(error) => {
                CHAT_APOLOGIES.click();
                session.stats_mut().apologies += 1;
                renderer.print_error(&describe_error(&error));
                renderer.finish_reply(APOLOGY);
                session.log_mut().push(ChatMessage::assistant(APOLOGY));
                TurnOutcome::Apologized { error }
            }
        };
        CHAT_TURN_DURATION.add(start.elapsed().as_secs_f64());
        outcome
    }

    /// Streams the reply for `request`, returning the raw accumulated text.
    async fn stream_reply(
        &self,
        request: ChatCompletionRequest,
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let limit = self.config.word_limit;
        let mut stream = self.client.stream_chat(request).await?;
        let mut accumulated = String::new();
        while let Some(delta) = stream.next().await {
            accumulated.push_str(&delta?);
            let display = strip_formatting_markers(&truncate_to_word_limit(&accumulated, limit));
            renderer.update_reply(&display);
        }
        Ok(accumulated)
    }
}

/// The text shown to the user for a failed turn.
pub fn describe_error(error: &Error) -> String {
    match error {
        Error::Api { status_code, body } => format!("Error: {status_code} - {body}"),
        _ => format!("Error connecting to DeepSeek API: {error}"),
    }
}
