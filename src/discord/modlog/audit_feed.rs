use super::{http_status, snowflake_time};
use crate::core::modlog::{AuditAction, AuditEntry, AuditFeed, FeedError};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use ::serenity::model::guild::audit_log::{Action, MessageAction};
use std::sync::Arc;

/// Reads the guild audit log over the Discord HTTP API.
pub struct SerenityAuditFeed {
    http: Arc<serenity::Http>,
}

impl SerenityAuditFeed {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn to_discord_action(action: AuditAction) -> Action {
    match action {
        AuditAction::MessageDelete => Action::Message(MessageAction::Delete),
        AuditAction::MessageBulkDelete => Action::Message(MessageAction::BulkDelete),
    }
}

#[async_trait]
impl AuditFeed for SerenityAuditFeed {
    async fn recent_entries(
        &self,
        guild_id: u64,
        action: AuditAction,
        limit: u8,
    ) -> Result<Vec<AuditEntry>, FeedError> {
        let logs = serenity::GuildId::new(guild_id)
            .audit_logs(
                &self.http,
                Some(to_discord_action(action)),
                None,
                None,
                Some(limit),
            )
            .await
            .map_err(|e| match http_status(&e) {
                Some(403) => FeedError::AccessDenied,
                _ => FeedError::Other(e.to_string()),
            })?;

        // Discord already returns newest first.
        Ok(logs
            .entries
            .into_iter()
            .map(|entry| AuditEntry {
                action,
                user_id: entry.user_id.get(),
                target_id: entry.target_id.map(|id| id.get()),
                created_at: snowflake_time(entry.id.get()),
            })
            .collect())
    }
}
