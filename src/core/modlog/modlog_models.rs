// Moderation log domain models.
//
// Pure data types with no Discord dependencies. The Discord layer converts
// serenity types into these before handing them to the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-guild moderation log configuration.
///
/// Persisted as `{ guild_id: SpaceConfig }`. Every list is kept free of
/// duplicates by the `add_*` helpers; nothing else should push into them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Destination channels, in the order they were added.
    #[serde(default)]
    pub channels: Vec<u64>,
    /// Roles whose messages are never logged.
    #[serde(default)]
    pub exempt_roles: Vec<u64>,
    /// Exact message contents that are never logged when deleted.
    #[serde(default)]
    pub exempt_texts: Vec<String>,
    /// Logging is suppressed until this moment.
    #[serde(default, with = "unix_seconds")]
    pub paused_until: Option<DateTime<Utc>>,
}

impl SpaceConfig {
    /// Returns `false` if the channel was already a destination.
    pub fn add_channel(&mut self, channel_id: u64) -> bool {
        if self.channels.contains(&channel_id) {
            return false;
        }
        self.channels.push(channel_id);
        true
    }

    /// Returns `false` if the role was already exempt.
    pub fn add_exempt_role(&mut self, role_id: u64) -> bool {
        if self.exempt_roles.contains(&role_id) {
            return false;
        }
        self.exempt_roles.push(role_id);
        true
    }

    /// Returns `false` if the text was already exempt.
    pub fn add_exempt_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.exempt_texts.contains(&text) {
            return false;
        }
        self.exempt_texts.push(text);
        true
    }

    /// Returns `false` if the text was not exempt.
    pub fn remove_exempt_text(&mut self, text: &str) -> bool {
        let before = self.exempt_texts.len();
        self.exempt_texts.retain(|t| t != text);
        self.exempt_texts.len() != before
    }
}

/// Snapshot of a guild message as it looked when we last saw it.
///
/// Role ids are captured at post time so exemptions still apply after the
/// author lost the role or left the guild.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSnapshot {
    pub message_id: u64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub author_bot: bool,
    pub author_roles: Vec<u64>,
    pub content: String,
    /// Attachment URLs.
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageSnapshot {
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

/// A message edit, with the snapshot before and after.
#[derive(Debug, Clone)]
pub struct MessageEdit {
    pub before: MessageSnapshot,
    pub after: MessageSnapshot,
}

impl MessageEdit {
    /// Discord also fires updates for embed unfurls; those change nothing we log.
    pub fn is_unchanged(&self) -> bool {
        self.before.content == self.after.content
            && self.before.attachments == self.after.attachments
    }
}

/// A bulk purge in a single channel.
#[derive(Debug, Clone)]
pub struct BulkDeletion {
    pub guild_id: u64,
    pub channel_id: u64,
    pub messages: Vec<MessageSnapshot>,
}

/// Who removed a message, as far as the audit log can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributionResult {
    /// The author removed their own message.
    SelfDeleted,
    /// A moderator removed it.
    AttributedTo(u64),
    /// The audit log could not be read.
    Unknown,
    /// The audit log was readable but nothing matched.
    NoMatch,
}

impl AttributionResult {
    /// Label shown in the "Deleted By"/"Moderator" field.
    ///
    /// `NoMatch` and `SelfDeleted` currently render the same.
    pub fn label(&self) -> String {
        match self {
            AttributionResult::SelfDeleted | AttributionResult::NoMatch => {
                "Author (self-deleted)".to_string()
            }
            AttributionResult::AttributedTo(user_id) => format!("<@{}>", user_id),
            AttributionResult::Unknown => "Unknown".to_string(),
        }
    }
}

/// `paused_until` is stored as unix seconds (fractional allowed) or `null`.
mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&(ts.timestamp_millis() as f64 / 1000.0)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let secs: Option<f64> = Option::deserialize(deserializer)?;
        secs.map(|secs| {
            DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", secs)))
        })
        .transpose()
    }
}
