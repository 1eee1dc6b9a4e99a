//! Server-Sent Events (SSE) processing for streaming completions.
//!
//! The chat completions endpoint answers with newline-delimited `data: ` lines.  Each line holds
//! either a JSON chunk carrying a text delta or the `[DONE]` sentinel.  This module turns the raw
//! byte stream into a stream of text deltas, one fragment at a time.

use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{STREAM_BYTES, STREAM_DECODE_ERRORS, STREAM_DELTAS, STREAM_ERRORS};
use crate::types::ChatCompletionChunk;

/// Prefix carried by every event line.
pub const DATA_PREFIX: &str = "data:";

/// Payload that terminates the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A boxed stream of text deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// What a single line of the event stream amounts to.
#[derive(Debug)]
enum Line {
    Delta(String),
    Done,
    Skip,
    Malformed(String, Error),
}

struct DecodeState<S> {
    stream: S,
    buffer: Vec<u8>,
    eof: bool,
    done: bool,
    deltas: usize,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl<S> DecodeState<S> {
    fn finish(&mut self) {
        self.done = true;
        if let Some(logger) = &self.logger {
            logger.log_stream_complete(self.deltas);
        }
    }
}

/// Process a stream of bytes into a stream of text deltas.
///
/// Blank lines, comments, undecodable bytes, and chunks without content are skipped.  A `data:`
/// payload that is not valid JSON is reported to the logger and skipped; the stream goes on.  The
/// stream ends at `[DONE]` or when the body ends.  A transport error is yielded once and ends the
/// stream.
pub fn process_sse<S>(
    byte_stream: S,
    logger: Option<Arc<dyn ClientLogger>>,
) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<Bytes>> + Unpin + Send + 'static,
{
    let state = DecodeState {
        stream: byte_stream,
        buffer: Vec::new(),
        eof: false,
        done: false,
        deltas: 0,
        logger,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            // First drain complete lines already buffered
            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line = state.buffer.drain(..=pos).collect::<Vec<_>>();
                match decode_line(&line) {
                    Line::Delta(text) => {
                        STREAM_DELTAS.click();
                        state.deltas += 1;
                        if let Some(logger) = &state.logger {
                            logger.log_delta(&text);
                        }
                        return Some((Ok(text), state));
                    }
                    Line::Done => {
                        state.finish();
                        return None;
                    }
                    Line::Skip => continue,
                    Line::Malformed(payload, err) => {
                        STREAM_DECODE_ERRORS.click();
                        if let Some(logger) = &state.logger {
                            logger.log_decode_failure(&payload, &err);
                        }
                        continue;
                    }
                }
            }

            if state.eof {
                state.finish();
                return None;
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(err)) => {
                    STREAM_ERRORS.click();
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.eof = true;
                    if !state.buffer.is_empty() {
                        state.buffer.push(b'\n');
                    }
                }
            }
        }
    })
}

/// Classify one raw line, including its trailing newline.
fn decode_line(raw: &[u8]) -> Line {
    let Ok(text) = std::str::from_utf8(raw) else {
        return Line::Skip;
    };
    let text = text.trim_end_matches(['\r', '\n']);
    let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
        return Line::Skip;
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload == DONE_SENTINEL {
        return Line::Done;
    }
    if payload.trim().is_empty() {
        return Line::Skip;
    }
    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => match chunk.content() {
            Some(content) if !content.is_empty() => Line::Delta(content.to_string()),
            _ => Line::Skip,
        },
        Err(err) => Line::Malformed(payload.to_string(), err.into()),
    }
}
