use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Model};

/// Body of a `POST` to the chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The model that will complete the conversation.
    pub model: Model,

    /// The conversation, optionally led by a single system message.
    pub messages: Vec<ChatMessage>,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Always true; the client only speaks the streaming protocol.
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Create a streaming request for `messages`, prefixed by `system` when one is given.
    pub fn new(model: Model, system: Option<&str>, messages: &[ChatMessage]) -> Self {
        let mut all = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system {
            all.push(ChatMessage::system(system));
        }
        all.extend_from_slice(messages);
        Self {
            model,
            messages: all,
            max_tokens: None,
            temperature: None,
            stream: true,
        }
    }

    /// Sets the maximum number of output tokens.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}
