//! Logging trait for completion client operations.
//!
//! This module provides the [`ClientLogger`] trait that lets callers capture every request,
//! delta, and failure passing through the [`DeepSeek`](crate::DeepSeek) client, and
//! [`JsonLinesLogger`], which appends each event to a file as one JSON object per line.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::types::ChatCompletionRequest;

/// A trait for logging completion client operations.
///
/// Implement this trait to record API interactions.  Every method has an empty default so an
/// implementation only overrides what it cares about.
///
/// # Example
///
/// ```rust,ignore
/// use seekchat::{ChatCompletionRequest, ClientLogger};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_request(&self, request: &ChatCompletionRequest) {
///         eprintln!("sending {} messages", request.messages.len());
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, request: &ChatCompletionRequest) {
        _ = request;
    }

    /// Log a single text delta as it is decoded.
    fn log_delta(&self, delta: &str) {
        _ = delta;
    }

    /// Log a `data:` payload that could not be decoded and was skipped.
    fn log_decode_failure(&self, payload: &str, error: &Error) {
        _ = payload;
        _ = error;
    }

    /// Log the end of a stream, with the number of deltas it produced.
    fn log_stream_complete(&self, deltas: usize) {
        _ = deltas;
    }

    /// Log a status or transport error.
    fn log_error(&self, error: &Error) {
        _ = error;
    }
}

/// Appends one JSON object per event to a file.
pub struct JsonLinesLogger {
    file: Mutex<BufWriter<File>>,
}

impl JsonLinesLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open log file", err))?;
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write(&self, event: &str, mut fields: Value) {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        if let Value::Object(map) = &mut fields {
            map.insert("ts".to_string(), json!(ts));
            map.insert("event".to_string(), json!(event));
        }
        if let Ok(mut file) = self.file.lock() {
            // best effort
            let _ = writeln!(file, "{fields}");
            let _ = file.flush();
        }
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(&self, request: &ChatCompletionRequest) {
        self.write(
            "request",
            json!({
                "model": request.model.to_string(),
                "messages": request.messages.len(),
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
            }),
        );
    }

    fn log_delta(&self, delta: &str) {
        self.write("delta", json!({ "text": delta }));
    }

    fn log_decode_failure(&self, payload: &str, error: &Error) {
        self.write(
            "decode_failure",
            json!({ "payload": payload, "error": error.to_string() }),
        );
    }

    fn log_stream_complete(&self, deltas: usize) {
        self.write("stream_complete", json!({ "deltas": deltas }));
    }

    fn log_error(&self, error: &Error) {
        self.write(
            "error",
            json!({ "status": error.status_code(), "error": error.to_string() }),
        );
    }
}
