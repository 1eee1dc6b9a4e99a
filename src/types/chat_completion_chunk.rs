use serde::{Deserialize, Serialize};

/// One decoded `data:` event from the streaming endpoint.
///
/// Only the fields needed to recover text deltas are modelled; everything else in the event is
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Identifier shared by all chunks of one completion.
    #[serde(default)]
    pub id: Option<String>,

    /// Candidate completions; the client reads the first.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A single choice within a [`ChatCompletionChunk`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Position of this choice.
    #[serde(default)]
    pub index: u32,

    /// The incremental change carried by this chunk.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Set on the last chunk of a choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The incremental message content within a [`ChunkChoice`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Present on the first chunk only.
    #[serde(default)]
    pub role: Option<String>,

    /// The text fragment, when this chunk carries one.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// The text fragment of the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices.first()?.delta.content.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_from_first_choice() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"abc","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), Some("Hel"));
        assert_eq!(chunk.id.as_deref(), Some("abc"));
    }

    #[test]
    fn role_only_and_empty_chunks_have_no_content() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#)
                .unwrap();
        assert_eq!(chunk.content(), None);

        let chunk: ChatCompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(chunk.content(), None);

        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
