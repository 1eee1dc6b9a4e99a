use std::fs::OpenOptions;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use biometrics::{Collector, Counter, Moments, PlainTextEmitter};

use crate::error::{Error, Result};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("seekchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("seekchat.client.request_errors");
pub(crate) static CLIENT_STATUS_ERRORS: Counter = Counter::new("seekchat.client.status_errors");

pub(crate) static STREAM_DELTAS: Counter = Counter::new("seekchat.stream.deltas");
pub(crate) static STREAM_DECODE_ERRORS: Counter = Counter::new("seekchat.stream.decode_errors");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("seekchat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("seekchat.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("seekchat.stream.ttfb_seconds");

pub(crate) static CHAT_TURNS: Counter = Counter::new("seekchat.chat.turns");
pub(crate) static CHAT_REJECTED_TURNS: Counter = Counter::new("seekchat.chat.rejected_turns");
pub(crate) static CHAT_USER_TRUNCATIONS: Counter = Counter::new("seekchat.chat.user_truncations");
pub(crate) static CHAT_REPLY_TRUNCATIONS: Counter =
    Counter::new("seekchat.chat.reply_truncations");
pub(crate) static CHAT_APOLOGIES: Counter = Counter::new("seekchat.chat.apologies");
pub(crate) static CHAT_RESETS: Counter = Counter::new("seekchat.chat.resets");
pub(crate) static CHAT_TURN_DURATION: Moments = Moments::new("seekchat.chat.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_STATUS_ERRORS);

    collector.register_counter(&STREAM_DELTAS);
    collector.register_counter(&STREAM_DECODE_ERRORS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_REJECTED_TURNS);
    collector.register_counter(&CHAT_USER_TRUNCATIONS);
    collector.register_counter(&CHAT_REPLY_TRUNCATIONS);
    collector.register_counter(&CHAT_APOLOGIES);
    collector.register_counter(&CHAT_RESETS);
    collector.register_moments(&CHAT_TURN_DURATION);
}

/// Append one reading of every sensor registered with `collector` to `path`.
pub fn emit_biometrics(collector: &Collector, path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| Error::io("failed to open metrics file", err))?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let mut emitter = PlainTextEmitter::new(file);
    collector
        .emit(&mut emitter, now)
        .map_err(|err| Error::io("failed to write metrics", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_counters_are_emitted() {
        let path = std::env::temp_dir().join(format!(
            "seekchat-metrics-{}-{}.txt",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);
        let collector = Collector::new();
        register_biometrics(&collector);
        CHAT_RESETS.click();

        emit_biometrics(&collector, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let resets = content
            .lines()
            .find(|line| line.starts_with("seekchat.chat.resets "))
            .unwrap();
        let reading = resets.rsplit(' ').next().unwrap().parse::<u64>().unwrap();
        assert!(reading >= 1);
        assert!(content.contains("seekchat.stream.ttfb_seconds "));
        let _ = std::fs::remove_file(&path);
    }
}
