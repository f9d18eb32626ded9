// Builds platform-neutral log records. The Discord layer turns these into
// embeds; nothing here knows about colors or emoji.

use super::modlog_models::{AttributionResult, BulkDeletion, MessageEdit, MessageSnapshot};
use chrono::{DateTime, Utc};

/// Longest content (in characters) that is placed in a field directly.
pub const INLINE_LIMIT: usize = 1024;
pub const TOO_LONG_PLACEHOLDER: &str = "Too long, see attached file.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    MessageDeleted,
    MessageEdited,
    BulkDelete,
    Test,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Text payload sent as a file next to the record.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedFile {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub kind: RecordKind,
    pub description: Option<String>,
    pub fields: Vec<RecordField>,
    pub attachment: Option<DetachedFile>,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    fn new(kind: RecordKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            description: None,
            fields: Vec::new(),
            attachment: None,
            timestamp,
        }
    }

    fn field(mut self, name: &str, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(RecordField {
            name: name.to_string(),
            value: value.into(),
            inline,
        });
        self
    }

    fn attach(mut self, filename: String, content: String) -> Self {
        self.attachment = Some(DetachedFile { filename, content });
        self
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

fn fits_inline(text: &str) -> bool {
    text.chars().count() <= INLINE_LIMIT
}

/// Record for a single deleted message.
///
/// Oversized content goes to a file and nothing else is added after the
/// placeholder, attachment URLs included.
pub fn deletion_record(
    message: &MessageSnapshot,
    deleted_by: AttributionResult,
    now: DateTime<Utc>,
) -> LogRecord {
    let mut record = LogRecord::new(RecordKind::MessageDeleted, now)
        .field("Author", format!("<@{}>", message.author_id), true)
        .field("Deleted By", deleted_by.label(), true)
        .field("Channel", format!("<#{}>", message.channel_id), false);

    if message.has_content() {
        if fits_inline(&message.content) {
            record = record.field("Content", message.content.clone(), false);
        } else {
            return record
                .field("Content", TOO_LONG_PLACEHOLDER, false)
                .attach(
                    format!("deleted_message_{}.txt", message.message_id),
                    message.content.clone(),
                );
        }
    }

    if !message.attachments.is_empty() {
        record = record.field("Attachments", message.attachments.join("\n"), false);
    }

    record
}

/// Record for an edited message. If either side is too long, both sides go
/// to a single file.
pub fn edit_record(edit: &MessageEdit, now: DateTime<Utc>) -> LogRecord {
    let before = &edit.before.content;
    let after = &edit.after.content;

    let record = LogRecord::new(RecordKind::MessageEdited, now)
        .field("Author", format!("<@{}>", edit.before.author_id), true)
        .field("Channel", format!("<#{}>", edit.after.channel_id), false);

    if fits_inline(before) && fits_inline(after) {
        let mut record = record;
        if !before.is_empty() {
            record = record.field("Before", before.clone(), false);
        }
        if !after.is_empty() {
            record = record.field("After", after.clone(), false);
        }
        return record;
    }

    record
        .field("Before", TOO_LONG_PLACEHOLDER, false)
        .field("After", TOO_LONG_PLACEHOLDER, false)
        .attach(
            format!("edited_message_{}.txt", edit.after.message_id),
            format!("Before:\n{}\n\nAfter:\n{}\n", before, after),
        )
}

/// Record for a bulk purge. The transcript is always attached, one line per
/// message in the order given.
pub fn bulk_record(
    bulk: &BulkDeletion,
    moderator: AttributionResult,
    now: DateTime<Utc>,
) -> LogRecord {
    let transcript: String = bulk
        .messages
        .iter()
        .map(|msg| {
            format!(
                "[{}] {} ({}): {}\n",
                msg.created_at.format("%Y-%m-%d %H:%M:%S"),
                msg.author_name,
                msg.author_id,
                msg.content
            )
        })
        .collect();

    LogRecord::new(RecordKind::BulkDelete, now)
        .field("Moderator", moderator.label(), true)
        .field("Channel", format!("<#{}>", bulk.channel_id), true)
        .field("Messages Deleted", bulk.messages.len().to_string(), false)
        .attach(
            format!("bulk_delete_{}.txt", now.format("%Y%m%d_%H%M%S")),
            transcript,
        )
}

/// Record sent by the test command.
pub fn test_record(now: DateTime<Utc>) -> LogRecord {
    let mut record = LogRecord::new(RecordKind::Test, now);
    record.description = Some("This is a test log entry.".to_string());
    record
}
