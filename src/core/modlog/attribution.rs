// Deletion attribution - figures out who removed a message.
//
// Discord does not say who deleted a message. The only trace is the guild
// audit log, which is written separately and shows up a moment later. We
// wait briefly, read the newest entries, and accept the first one that
// targets the right author and is recent enough to belong to this deletion.
//
// NO Discord dependencies here - the audit log is reached through `AuditFeed`.

use super::clock::Clock;
use super::modlog_models::{AttributionResult, MessageSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// AUDIT FEED PORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    MessageDelete,
    MessageBulkDelete,
}

/// One audit log entry, reduced to what attribution needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: AuditAction,
    /// The moderator who performed the action.
    pub user_id: u64,
    /// For message deletes: the author of the deleted message.
    pub target_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Missing permission to view the audit log")]
    AccessDenied,
    #[error("Audit log request failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait AuditFeed: Send + Sync {
    /// The newest `limit` entries of `action`, newest first.
    async fn recent_entries(
        &self,
        guild_id: u64,
        action: AuditAction,
        limit: u8,
    ) -> Result<Vec<AuditEntry>, FeedError>;
}

// ============================================================================
// POLICY
// ============================================================================

#[derive(Debug, Clone)]
pub struct AttributionPolicy {
    /// Wait before reading the audit log so the entry has time to appear.
    pub settle_delay: Duration,
    pub delete_lookback: u8,
    /// Entries at least this old are unrelated to the deletion.
    pub delete_window: chrono::Duration,
    pub bulk_lookback: u8,
    pub bulk_window: chrono::Duration,
}

impl Default for AttributionPolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            delete_lookback: 5,
            delete_window: chrono::Duration::seconds(15),
            bulk_lookback: 1,
            bulk_window: chrono::Duration::seconds(5),
        }
    }
}

// ============================================================================
// MATCHING
// ============================================================================

/// Pick the moderator for a single deleted message out of `entries`.
///
/// Scans newest first and stops at the first hit. An empty feed keeps the
/// self-delete default; a non-empty feed without a hit is `NoMatch`.
pub fn match_deletion(
    entries: &[AuditEntry],
    author_id: u64,
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> AttributionResult {
    if entries.is_empty() {
        return AttributionResult::SelfDeleted;
    }

    entries
        .iter()
        .find(|entry| {
            entry.action == AuditAction::MessageDelete
                && entry.target_id == Some(author_id)
                && now - entry.created_at < window
        })
        .map(|entry| AttributionResult::AttributedTo(entry.user_id))
        .unwrap_or(AttributionResult::NoMatch)
}

/// Pick the moderator for a bulk purge. Only the newest entry is considered.
pub fn match_bulk(
    entries: &[AuditEntry],
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> AttributionResult {
    match entries.first() {
        Some(entry)
            if entry.action == AuditAction::MessageBulkDelete
                && now - entry.created_at < window =>
        {
            AttributionResult::AttributedTo(entry.user_id)
        }
        _ => AttributionResult::Unknown,
    }
}

// ============================================================================
// ATTRIBUTOR
// ============================================================================

pub struct Attributor {
    policy: AttributionPolicy,
}

impl Attributor {
    pub fn new(policy: AttributionPolicy) -> Self {
        Self { policy }
    }

    /// Attribute a single deleted message. Never fails; an unreadable audit
    /// log degrades to `Unknown`.
    pub async fn attribute_deletion<F: AuditFeed, C: Clock>(
        &self,
        feed: &F,
        clock: &C,
        message: &MessageSnapshot,
    ) -> AttributionResult {
        if !self.policy.settle_delay.is_zero() {
            tokio::time::sleep(self.policy.settle_delay).await;
        }

        let entries = match feed
            .recent_entries(
                message.guild_id,
                AuditAction::MessageDelete,
                self.policy.delete_lookback,
            )
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    guild_id = message.guild_id,
                    message_id = message.message_id,
                    error = %e,
                    "Could not read audit log for deletion"
                );
                return AttributionResult::Unknown;
            }
        };

        match_deletion(
            &entries,
            message.author_id,
            clock.now(),
            self.policy.delete_window,
        )
    }

    /// Attribute a bulk purge. Only the newest bulk-delete entry counts.
    pub async fn attribute_bulk<F: AuditFeed, C: Clock>(
        &self,
        feed: &F,
        clock: &C,
        guild_id: u64,
    ) -> AttributionResult {
        match feed
            .recent_entries(
                guild_id,
                AuditAction::MessageBulkDelete,
                self.policy.bulk_lookback,
            )
            .await
        {
            Ok(entries) => match_bulk(&entries, clock.now(), self.policy.bulk_window),
            Err(e) => {
                tracing::warn!(guild_id, error = %e, "Could not read audit log for bulk delete");
                AttributionResult::Unknown
            }
        }
    }
}
