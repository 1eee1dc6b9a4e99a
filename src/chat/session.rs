//! Session state: the conversation log and the counters that go with it.
//!
//! A [`Session`] is an explicit value owned by whoever drives the conversation.  Nothing here is
//! global; two sessions never share a log.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::types::{ChatMessage, Role};

/// Identifies one interactive session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocates an identifier not used by any other session in this process.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SessionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// The ordered record of a conversation.
///
/// Messages are only ever appended, except by [`ConversationLog::reset`].  System messages are
/// never stored; they are prepended at request time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user or assistant message.
    ///
    /// # Errors
    ///
    /// Returns a validation error for system messages.
    pub fn append(&mut self, message: ChatMessage) -> Result<()> {
        if message.role == Role::System {
            return Err(Error::validation(
                "system messages are not stored in the conversation log",
                Some("role".to_string()),
            ));
        }
        self.push(message);
        Ok(())
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        debug_assert_ne!(message.role, Role::System);
        self.messages.push(message);
    }

    /// Clears the log, then appends `seed` when one is given.
    pub fn reset(&mut self, seed: Option<ChatMessage>) {
        self.messages.clear();
        if let Some(seed) = seed {
            self.push(seed);
        }
    }

    /// The messages in chronological order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of stored messages.
    pub fn count(&self) -> usize {
        self.messages.len()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Counters kept for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Turns that reached the completion endpoint.
    pub turns: u64,
    /// Submissions refused because the log was full.
    pub rejected: u64,
    /// User messages cut at the word limit.
    pub user_truncations: u64,
    /// Replies cut at the word limit.
    pub reply_truncations: u64,
    /// Turns recorded as an apology after a failure.
    pub apologies: u64,
    /// Explicit resets.
    pub resets: u64,
}

/// One interactive session: an identifier, its log, and the seed restored on reset.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    log: ConversationLog,
    seed: Option<ChatMessage>,
    stats: SessionStats,
}

impl Session {
    /// Starts a session whose log begins with `seed`, when one is given.
    pub fn new(seed: Option<String>) -> Self {
        let seed = seed.map(ChatMessage::assistant);
        let mut log = ConversationLog::new();
        log.reset(seed.clone());
        Self {
            id: SessionId::next(),
            log,
            seed,
            stats: SessionStats::default(),
        }
    }

    /// This session's identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Read-only view of the conversation.
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub(crate) fn log_mut(&mut self) -> &mut ConversationLog {
        &mut self.log
    }

    /// The opening message restored on reset.
    pub fn seed(&self) -> Option<&ChatMessage> {
        self.seed.as_ref()
    }

    /// Returns the number of stored messages.
    pub fn count(&self) -> usize {
        self.log.count()
    }

    /// Clears the conversation and restores the seed.
    pub fn reset(&mut self) {
        self.log.reset(self.seed.clone());
        self.stats.resets += 1;
    }

    /// Restores the seed if the log is empty, returning true when it did.
    pub fn ensure_seeded(&mut self) -> bool {
        match &self.seed {
            Some(seed) if self.log.is_empty() => {
                self.log.push(seed.clone());
                true
            }
            _ => false,
        }
    }

    /// The session's counters.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut SessionStats {
        &mut self.stats
    }
}
