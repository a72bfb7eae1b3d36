use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedMessage {
    pub channel_id: String,
    pub message_id: String,
}

/// Guild id -> pinned message, for the lifetime of the process.
///
/// The lock is only ever held for map access, never across I/O.
#[derive(Debug, Default)]
pub struct MessageRegistry {
    messages: Mutex<HashMap<String, TrackedMessage>>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, TrackedMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self) {
        self.guard().clear();
    }

    pub fn track(&self, guild_id: &str, message: TrackedMessage) {
        self.guard().insert(guild_id.to_string(), message);
    }

    pub fn get(&self, guild_id: &str) -> Option<TrackedMessage> {
        self.guard().get(guild_id).cloned()
    }

    pub fn is_tracked(&self, guild_id: &str, message_id: &str) -> bool {
        self.guard()
            .get(guild_id)
            .is_some_and(|m| m.message_id == message_id)
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}
