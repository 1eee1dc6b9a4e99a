// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod render;
pub mod sse;
pub mod text;
pub mod types;

// Re-exports
pub use client::{API_KEY_ENV, ChatCompletions, DeepSeek};
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use error::{Error, Result};
pub use observability::{emit_biometrics, register_biometrics};
pub use render::{PlainTextRenderer, Renderer};
pub use sse::{DeltaStream, process_sse};
pub use text::{count_words, strip_formatting_markers, truncate_to_word_limit};
pub use types::*;
