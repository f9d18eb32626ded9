use super::modlog_models::MessageSnapshot;
use dashmap::DashMap;

// Cap how many messages we keep in memory so we don't grow unbounded.
const MAX_TRACKED_MESSAGES: usize = 5_000;

/// Message snapshots kept so deletions/edits can be logged even if
/// Serenity's cache has already evicted the original message.
pub struct MessageTracker {
    messages: DashMap<u64, MessageSnapshot>,
    capacity: usize,
}

impl Default for MessageTracker {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_MESSAGES)
    }
}

impl MessageTracker {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: DashMap::new(),
            capacity,
        }
    }

    /// Store (or replace) a snapshot.
    pub fn remember(&self, message: MessageSnapshot) {
        let message_id = message.message_id;
        self.messages.insert(message_id, message);

        // Simple eviction: drop the oldest snapshot once we cross the cap.
        // Message ids are snowflakes, so the smallest id is the oldest post.
        if self.messages.len() > self.capacity {
            let oldest = self
                .messages
                .iter()
                .map(|entry| *entry.key())
                .filter(|id| *id != message_id)
                .min();
            if let Some(oldest) = oldest {
                self.messages.remove(&oldest);
            }
        }
    }

    /// Look at a snapshot without removing it (edits).
    pub fn get(&self, message_id: u64) -> Option<MessageSnapshot> {
        self.messages.get(&message_id).map(|m| m.clone())
    }

    /// Remove and return a snapshot (deletions).
    pub fn take(&self, message_id: u64) -> Option<MessageSnapshot> {
        self.messages.remove(&message_id).map(|(_, msg)| msg)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }
}
