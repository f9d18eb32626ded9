// Moderation log service - core business logic for message logging.
//
// This service handles:
// - Per-guild configuration (get-or-create, mutate, persist)
// - The pause window and role/text exemptions
// - Routing delete/edit/bulk events through attribution to the log sink
//
// NO Discord dependencies here - the audit log and the destination channels
// are reached through the `AuditFeed` and `LogSink` ports.

use super::attribution::{AttributionPolicy, Attributor, AuditFeed};
use super::clock::{Clock, SystemClock};
use super::config_store::{ConfigStore, StoreError};
use super::exemption::{is_exempt, EventKind};
use super::message_tracker::MessageTracker;
use super::modlog_models::{BulkDeletion, MessageEdit, MessageSnapshot, SpaceConfig};
use super::pause_gate::{self, PauseCheck};
use super::record_builder::{self, LogRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModLogError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Missing permission to post in channel")]
    AccessDenied,
    #[error("Channel no longer exists")]
    NotFound,
    #[error("Send failed: {0}")]
    Other(String),
}

// ============================================================================
// OUTPUT PORT
// ============================================================================

/// Where finished records go.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn send(&self, channel_id: u64, record: &LogRecord) -> Result<(), SinkError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Where an event stopped in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Bot-authored; never logged.
    Ignored,
    Exempt,
    Paused,
    /// Edit that changed neither content nor attachments.
    Unchanged,
    Delivered(DeliveryReport),
}

/// Snapshot used by the status command.
#[derive(Debug, Clone)]
pub struct ModLogStatus {
    pub config: SpaceConfig,
    pub pause_remaining: Option<chrono::Duration>,
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModLogService<S: ConfigStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    attributor: Attributor,
    tracker: MessageTracker,
}

impl<S: ConfigStore> ModLogService<S> {
    pub fn new(store: S, policy: AttributionPolicy) -> Self {
        Self::with_clock(store, policy, SystemClock)
    }
}

impl<S: ConfigStore, C: Clock> ModLogService<S, C> {
    pub fn with_clock(store: S, policy: AttributionPolicy, clock: C) -> Self {
        Self {
            store,
            clock,
            attributor: Attributor::new(policy),
            tracker: MessageTracker::default(),
        }
    }

    /// Snapshots of recent guild messages.
    pub fn tracker(&self) -> &MessageTracker {
        &self.tracker
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Load a guild's config, creating and persisting defaults on first use.
    pub async fn get_or_create(&self, guild_id: u64) -> Result<SpaceConfig, StoreError> {
        if let Some(config) = self.store.get_config(guild_id).await? {
            return Ok(config);
        }

        let config = SpaceConfig::default();
        self.store.save_config(guild_id, config.clone()).await?;
        tracing::info!(guild_id, "Created default moderation log config");
        Ok(config)
    }

    /// Apply `mutate` to a guild's config and persist the result.
    pub async fn update<R, F>(&self, guild_id: u64, mutate: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut SpaceConfig) -> R + Send,
        R: Send,
    {
        let mut config = self.get_or_create(guild_id).await?;
        let result = mutate(&mut config);
        self.store.save_config(guild_id, config).await?;
        Ok(result)
    }

    /// Returns `false` if the channel was already a destination.
    pub async fn add_channel(&self, guild_id: u64, channel_id: u64) -> Result<bool, StoreError> {
        self.update(guild_id, |c| c.add_channel(channel_id)).await
    }

    pub async fn add_exempt_role(&self, guild_id: u64, role_id: u64) -> Result<bool, StoreError> {
        self.update(guild_id, |c| c.add_exempt_role(role_id)).await
    }

    pub async fn add_exempt_text(&self, guild_id: u64, text: String) -> Result<bool, StoreError> {
        self.update(guild_id, |c| c.add_exempt_text(text)).await
    }

    pub async fn remove_exempt_text(&self, guild_id: u64, text: &str) -> Result<bool, StoreError> {
        let text = text.to_string();
        self.update(guild_id, move |c| c.remove_exempt_text(&text))
            .await
    }

    /// Suppress logging for `minutes`. Returns when the pause ends.
    pub async fn pause_for(
        &self,
        guild_id: u64,
        minutes: u32,
    ) -> Result<DateTime<Utc>, StoreError> {
        let until = self.clock.now() + chrono::Duration::minutes(minutes as i64);
        self.update(guild_id, |c| c.paused_until = Some(until))
            .await?;
        tracing::info!(guild_id, %until, "Moderation logging paused");
        Ok(until)
    }

    pub async fn unpause(&self, guild_id: u64) -> Result<(), StoreError> {
        self.update(guild_id, |c| c.paused_until = None).await
    }

    /// Replace the guild's config with fresh defaults.
    pub async fn reset(&self, guild_id: u64) -> Result<(), StoreError> {
        self.store
            .save_config(guild_id, SpaceConfig::default())
            .await
    }

    pub async fn status(&self, guild_id: u64) -> Result<ModLogStatus, StoreError> {
        let mut config = self.get_or_create(guild_id).await?;
        let pause_remaining = match self.gate(guild_id, &mut config).await {
            PauseCheck::Active(remaining) => Some(remaining),
            PauseCheck::Inactive | PauseCheck::Cleared => None,
        };
        Ok(ModLogStatus {
            config,
            pause_remaining,
        })
    }

    // ------------------------------------------------------------------
    // Pause gate
    // ------------------------------------------------------------------

    /// Whether the guild is paused right now. An expired pause is cleared
    /// and persisted.
    #[cfg(test)]
    pub async fn is_paused(&self, guild_id: u64) -> Result<bool, StoreError> {
        let mut config = self.get_or_create(guild_id).await?;
        Ok(self.gate(guild_id, &mut config).await.is_paused())
    }

    /// Check the pause window on `config`. Clearing an expired pause is
    /// persisted best-effort: a failed write is logged and the in-memory
    /// result still stands.
    async fn gate(&self, guild_id: u64, config: &mut SpaceConfig) -> PauseCheck {
        let check = pause_gate::check(config, self.clock.now());
        if check == PauseCheck::Cleared {
            match self.store.save_config(guild_id, config.clone()).await {
                Ok(()) => tracing::info!(guild_id, "Pause expired, moderation logging resumed"),
                Err(e) => tracing::warn!(
                    guild_id,
                    error = %e,
                    "Pause expired but clearing it could not be saved"
                ),
            }
        }
        check
    }

    /// Config for the event pipeline. Unlike `get_or_create`, failing to
    /// persist first-use defaults does not stop the event.
    async fn event_config(&self, guild_id: u64) -> Result<SpaceConfig, StoreError> {
        if let Some(config) = self.store.get_config(guild_id).await? {
            return Ok(config);
        }

        let config = SpaceConfig::default();
        if let Err(e) = self.store.save_config(guild_id, config.clone()).await {
            tracing::warn!(guild_id, error = %e, "Could not save default moderation log config");
        }
        Ok(config)
    }

    // ------------------------------------------------------------------
    // Event dispatch
    // ------------------------------------------------------------------

    /// Log a single deleted message.
    ///
    /// Exemptions are checked before the audit log is queried.
    pub async fn handle_delete<F: AuditFeed, K: LogSink>(
        &self,
        message: MessageSnapshot,
        feed: &F,
        sink: &K,
    ) -> Result<DispatchOutcome, ModLogError> {
        if message.author_bot {
            return Ok(DispatchOutcome::Ignored);
        }

        let guild_id = message.guild_id;
        let mut config = self.event_config(guild_id).await?;

        if is_exempt(&config, &message, EventKind::Deletion) {
            tracing::debug!(guild_id, message_id = message.message_id, "Deletion is exempt");
            return Ok(DispatchOutcome::Exempt);
        }

        if self.gate(guild_id, &mut config).await.is_paused() {
            return Ok(DispatchOutcome::Paused);
        }

        let deleted_by = self
            .attributor
            .attribute_deletion(feed, &self.clock, &message)
            .await;
        tracing::debug!(
            guild_id,
            message_id = message.message_id,
            ?deleted_by,
            "Deletion attributed"
        );

        let record = record_builder::deletion_record(&message, deleted_by, self.clock.now());
        self.deliver(guild_id, &record, sink).await
    }

    /// Log an edited message.
    pub async fn handle_edit<K: LogSink>(
        &self,
        edit: MessageEdit,
        sink: &K,
    ) -> Result<DispatchOutcome, ModLogError> {
        if edit.before.author_bot {
            return Ok(DispatchOutcome::Ignored);
        }
        if edit.is_unchanged() {
            return Ok(DispatchOutcome::Unchanged);
        }

        let guild_id = edit.after.guild_id;
        let mut config = self.event_config(guild_id).await?;

        if is_exempt(&config, &edit.before, EventKind::Edit) {
            return Ok(DispatchOutcome::Exempt);
        }

        if self.gate(guild_id, &mut config).await.is_paused() {
            return Ok(DispatchOutcome::Paused);
        }

        let record = record_builder::edit_record(&edit, self.clock.now());
        self.deliver(guild_id, &record, sink).await
    }

    /// Log a bulk purge. Bulk purges are not subject to exemptions.
    pub async fn handle_bulk_delete<F: AuditFeed, K: LogSink>(
        &self,
        bulk: BulkDeletion,
        feed: &F,
        sink: &K,
    ) -> Result<DispatchOutcome, ModLogError> {
        if bulk.messages.is_empty() {
            return Err(ModLogError::MalformedEvent(format!(
                "bulk delete in channel {} carried no known messages",
                bulk.channel_id
            )));
        }

        let guild_id = bulk.guild_id;
        let mut config = self.event_config(guild_id).await?;
        if self.gate(guild_id, &mut config).await.is_paused() {
            return Ok(DispatchOutcome::Paused);
        }

        let moderator = self
            .attributor
            .attribute_bulk(feed, &self.clock, guild_id)
            .await;

        let record = record_builder::bulk_record(&bulk, moderator, self.clock.now());
        self.deliver(guild_id, &record, sink).await
    }

    /// Send a test record to every destination.
    pub async fn send_test_record<K: LogSink>(
        &self,
        guild_id: u64,
        sink: &K,
    ) -> Result<DispatchOutcome, ModLogError> {
        let record = record_builder::test_record(self.clock.now());
        self.deliver(guild_id, &record, sink).await
    }

    /// Send `record` to each destination channel. A failing destination is
    /// logged and skipped; the rest still get the record.
    async fn deliver<K: LogSink>(
        &self,
        guild_id: u64,
        record: &LogRecord,
        sink: &K,
    ) -> Result<DispatchOutcome, ModLogError> {
        // Re-read: attribution may have slept long enough for config to change.
        let mut config = self.event_config(guild_id).await?;
        if self.gate(guild_id, &mut config).await.is_paused() {
            return Ok(DispatchOutcome::Paused);
        }

        let mut report = DeliveryReport::default();
        for &channel_id in &config.channels {
            match sink.send(channel_id, record).await {
                Ok(()) => report.delivered += 1,
                Err(SinkError::NotFound) => {
                    tracing::debug!(guild_id, channel_id, "Log channel no longer exists");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(guild_id, channel_id, error = %e, "Failed to send log");
                    report.failed += 1;
                }
            }
        }

        Ok(DispatchOutcome::Delivered(report))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::modlog::attribution::{AuditAction, AuditEntry, FeedError};
    use crate::core::modlog::attribution::tests::{
        base_time, bulk_entry, delete_entry, ScriptedFeed,
    };
    use crate::core::modlog::clock::ManualClock;
    use crate::core::modlog::record_builder::RecordKind;
    use chrono::Duration;
    use dashmap::DashMap;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const GUILD: u64 = 1;
    const AUTHOR: u64 = 100;
    const MODERATOR: u64 = 200;

    /// In-memory store for testing
    #[derive(Default)]
    struct MockConfigStore {
        configs: DashMap<u64, SpaceConfig>,
        saves: AtomicUsize,
        failing: AtomicBool,
    }

    impl MockConfigStore {
        fn save_count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConfigStore for Arc<MockConfigStore> {
        async fn get_config(&self, guild_id: u64) -> Result<Option<SpaceConfig>, StoreError> {
            Ok(self.configs.get(&guild_id).map(|c| c.clone()))
        }

        async fn save_config(
            &self,
            guild_id: u64,
            config: SpaceConfig,
        ) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.configs.insert(guild_id, config);
            Ok(())
        }
    }

    /// Sink that records what it was asked to send.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(u64, LogRecord)>>,
        broken: HashMap<u64, fn() -> SinkError>,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<(u64, LogRecord)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LogSink for RecordingSink {
        async fn send(&self, channel_id: u64, record: &LogRecord) -> Result<(), SinkError> {
            if let Some(make_error) = self.broken.get(&channel_id) {
                return Err(make_error());
            }
            self.sent.lock().unwrap().push((channel_id, record.clone()));
            Ok(())
        }
    }

    /// Audit feed that pauses the guild while it is being read, the way an
    /// admin running /pause during the settle delay would.
    struct PausingFeed {
        store: Arc<MockConfigStore>,
        until: DateTime<Utc>,
    }

    #[async_trait]
    impl AuditFeed for PausingFeed {
        async fn recent_entries(
            &self,
            guild_id: u64,
            _action: AuditAction,
            _limit: u8,
        ) -> Result<Vec<AuditEntry>, FeedError> {
            if let Some(mut config) = self.store.configs.get_mut(&guild_id) {
                config.paused_until = Some(self.until);
            }
            Ok(Vec::new())
        }
    }

    struct Harness {
        store: Arc<MockConfigStore>,
        clock: Arc<ManualClock>,
        service: ModLogService<Arc<MockConfigStore>, Arc<ManualClock>>,
    }

    fn harness(channels: &[u64]) -> Harness {
        harness_with_policy(
            channels,
            AttributionPolicy {
                settle_delay: std::time::Duration::ZERO,
                ..Default::default()
            },
        )
    }

    fn harness_with_policy(channels: &[u64], policy: AttributionPolicy) -> Harness {
        let store = Arc::new(MockConfigStore::default());
        let mut config = SpaceConfig::default();
        for &channel in channels {
            config.add_channel(channel);
        }
        store.configs.insert(GUILD, config);

        let clock = Arc::new(ManualClock::new(base_time()));
        let service = ModLogService::with_clock(Arc::clone(&store), policy, Arc::clone(&clock));
        Harness {
            store,
            clock,
            service,
        }
    }

    fn message(content: &str) -> MessageSnapshot {
        MessageSnapshot {
            message_id: 555,
            guild_id: GUILD,
            channel_id: 42,
            author_id: AUTHOR,
            author_name: "alice".to_string(),
            author_bot: false,
            author_roles: vec![7],
            content: content.to_string(),
            attachments: Vec::new(),
            created_at: base_time() - Duration::seconds(2),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_persists_defaults() {
        let h = harness(&[]);
        let config = h.service.get_or_create(999).await.unwrap();

        assert_eq!(config, SpaceConfig::default());
        assert!(h.store.configs.contains_key(&999));
        assert_eq!(h.store.save_count(), 1);

        h.service.get_or_create(999).await.unwrap();
        assert_eq!(h.store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_adds_stay_unique() {
        let h = harness(&[]);
        assert!(h.service.add_channel(GUILD, 10).await.unwrap());
        assert!(!h.service.add_channel(GUILD, 10).await.unwrap());
        assert!(h.service.add_exempt_role(GUILD, 3).await.unwrap());
        assert!(!h.service.add_exempt_role(GUILD, 3).await.unwrap());
        assert!(h.service.add_exempt_text(GUILD, "gm".into()).await.unwrap());
        assert!(!h.service.add_exempt_text(GUILD, "gm".into()).await.unwrap());
        assert!(h.service.remove_exempt_text(GUILD, "gm").await.unwrap());

        let config = h.service.get_or_create(GUILD).await.unwrap();
        assert_eq!(config.channels, vec![10]);
        assert_eq!(config.exempt_roles, vec![3]);
        assert!(config.exempt_texts.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates() {
        let h = harness(&[]);
        h.store.failing.store(true, Ordering::SeqCst);

        let result = h.service.add_channel(GUILD, 10).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(h.store.configs.get(&GUILD).unwrap().channels.is_empty());
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let h = harness(&[10, 11]);
        h.service.add_exempt_role(GUILD, 3).await.unwrap();
        h.service.reset(GUILD).await.unwrap();

        assert_eq!(
            h.service.get_or_create(GUILD).await.unwrap(),
            SpaceConfig::default()
        );
    }

    #[tokio::test]
    async fn test_moderator_delete_reaches_every_destination() {
        let h = harness(&[10, 11]);
        let feed = ScriptedFeed::with_entries(vec![delete_entry(MODERATOR, AUTHOR, 2_000)]);
        let sink = RecordingSink::default();

        let outcome = h
            .service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::Delivered(DeliveryReport {
                delivered: 2,
                failed: 0
            })
        );
        let sent = sink.sent();
        assert_eq!(sent.iter().map(|(c, _)| *c).collect::<Vec<_>>(), vec![10, 11]);
        let record = &sent[0].1;
        assert_eq!(record.kind, RecordKind::MessageDeleted);
        assert_eq!(record.field_value("Deleted By"), Some("<@200>"));
        assert_eq!(record.field_value("Content"), Some("hello"));
    }

    #[tokio::test]
    async fn test_denied_audit_log_still_logs() {
        let h = harness(&[10]);
        let feed = ScriptedFeed::denied();
        let sink = RecordingSink::default();

        h.service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.field_value("Deleted By"), Some("Unknown"));
    }

    #[tokio::test]
    async fn test_exempt_role_skips_audit_log() {
        let h = harness(&[10]);
        h.service.add_exempt_role(GUILD, 7).await.unwrap();
        let feed = ScriptedFeed::with_entries(vec![delete_entry(MODERATOR, AUTHOR, 0)]);
        let sink = RecordingSink::default();

        let outcome = h
            .service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Exempt);
        assert_eq!(feed.query_count(), 0);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_exempt_text_skips_deletion() {
        let h = harness(&[10]);
        h.service
            .add_exempt_text(GUILD, "hello".into())
            .await
            .unwrap();
        let feed = ScriptedFeed::with_entries(vec![]);
        let sink = RecordingSink::default();

        let outcome = h
            .service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Exempt);
        assert_eq!(feed.query_count(), 0);
    }

    #[tokio::test]
    async fn test_bot_messages_are_ignored() {
        let h = harness(&[10]);
        let feed = ScriptedFeed::with_entries(vec![]);
        let sink = RecordingSink::default();
        let mut bot_message = message("beep");
        bot_message.author_bot = true;

        let outcome = h
            .service
            .handle_delete(bot_message, &feed, &sink)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_pause_window_then_resume() {
        let h = harness(&[10]);
        let feed = ScriptedFeed::with_entries(vec![]);
        let sink = RecordingSink::default();

        h.service.pause_for(GUILD, 10).await.unwrap();

        h.clock.advance(Duration::minutes(5));
        let outcome = h
            .service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Paused);
        assert!(sink.sent().is_empty());
        assert_eq!(feed.query_count(), 0);

        h.clock.advance(Duration::minutes(6));
        let outcome = h
            .service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Delivered(_)));
        assert_eq!(sink.sent().len(), 1);
        assert_eq!(h.store.configs.get(&GUILD).unwrap().paused_until, None);
    }

    #[tokio::test]
    async fn test_expired_pause_cleared_once() {
        let h = harness(&[]);
        h.service.pause_for(GUILD, 1).await.unwrap();
        h.clock.advance(Duration::minutes(1));
        let saves = h.store.save_count();

        assert!(!h.service.is_paused(GUILD).await.unwrap());
        assert_eq!(h.store.save_count(), saves + 1);
        assert!(!h.service.is_paused(GUILD).await.unwrap());
        assert!(!h.service.is_paused(GUILD).await.unwrap());
        assert_eq!(h.store.save_count(), saves + 1);
    }

    #[tokio::test]
    async fn test_status_reports_remaining_pause() {
        let h = harness(&[10]);
        h.service.pause_for(GUILD, 10).await.unwrap();
        h.clock.advance(Duration::minutes(4));

        let status = h.service.status(GUILD).await.unwrap();
        assert_eq!(status.pause_remaining, Some(Duration::minutes(6)));
        assert_eq!(status.config.channels, vec![10]);

        h.service.unpause(GUILD).await.unwrap();
        assert_eq!(h.service.status(GUILD).await.unwrap().pause_remaining, None);
    }

    #[tokio::test]
    async fn test_broken_destination_does_not_stop_delivery() {
        let h = harness(&[10, 11, 12]);
        let feed = ScriptedFeed::with_entries(vec![]);
        let mut sink = RecordingSink::default();
        sink.broken.insert(11, || SinkError::NotFound);
        sink.broken.insert(12, || SinkError::AccessDenied);

        let outcome = h
            .service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::Delivered(DeliveryReport {
                delivered: 1,
                failed: 2
            })
        );
        assert_eq!(sink.sent()[0].0, 10);
    }

    #[tokio::test]
    async fn test_unchanged_edit_is_skipped() {
        let h = harness(&[10]);
        let sink = RecordingSink::default();
        let edit = MessageEdit {
            before: message("hello"),
            after: message("hello"),
        };

        let outcome = h.service.handle_edit(edit, &sink).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_edit_ignores_text_exemption() {
        let h = harness(&[10]);
        h.service
            .add_exempt_text(GUILD, "hello".into())
            .await
            .unwrap();
        let sink = RecordingSink::default();
        let edit = MessageEdit {
            before: message("hello"),
            after: message("hello there"),
        };

        let outcome = h.service.handle_edit(edit, &sink).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Delivered(_)));
        assert_eq!(sink.sent()[0].1.kind, RecordKind::MessageEdited);
    }

    #[tokio::test]
    async fn test_edit_by_exempt_role() {
        let h = harness(&[10]);
        h.service.add_exempt_role(GUILD, 7).await.unwrap();
        let sink = RecordingSink::default();
        let edit = MessageEdit {
            before: message("hello"),
            after: message("hello there"),
        };

        assert_eq!(
            h.service.handle_edit(edit, &sink).await.unwrap(),
            DispatchOutcome::Exempt
        );
    }

    #[tokio::test]
    async fn test_bulk_without_recent_entry() {
        let h = harness(&[10]);
        let feed = ScriptedFeed::with_entries(vec![bulk_entry(MODERATOR, 8_000)]);
        let sink = RecordingSink::default();
        let bulk = BulkDeletion {
            guild_id: GUILD,
            channel_id: 42,
            messages: vec![message("one"), message("two"), message("three")],
        };

        h.service
            .handle_bulk_delete(bulk, &feed, &sink)
            .await
            .unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        let record = &sent[0].1;
        assert_eq!(record.kind, RecordKind::BulkDelete);
        assert_eq!(record.field_value("Moderator"), Some("Unknown"));
        let file = record.attachment.as_ref().unwrap();
        assert_eq!(file.content.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_bulk_with_recent_entry() {
        let h = harness(&[10]);
        let feed = ScriptedFeed::with_entries(vec![bulk_entry(MODERATOR, 1_000)]);
        let sink = RecordingSink::default();
        let bulk = BulkDeletion {
            guild_id: GUILD,
            channel_id: 42,
            messages: vec![message("one")],
        };

        h.service
            .handle_bulk_delete(bulk, &feed, &sink)
            .await
            .unwrap();
        assert_eq!(sink.sent()[0].1.field_value("Moderator"), Some("<@200>"));
    }

    #[tokio::test]
    async fn test_empty_bulk_is_malformed() {
        let h = harness(&[10]);
        let feed = ScriptedFeed::with_entries(vec![]);
        let sink = RecordingSink::default();
        let bulk = BulkDeletion {
            guild_id: GUILD,
            channel_id: 42,
            messages: Vec::new(),
        };

        let result = h.service.handle_bulk_delete(bulk, &feed, &sink).await;
        assert!(matches!(result, Err(ModLogError::MalformedEvent(_))));
        assert_eq!(feed.query_count(), 0);
    }

    #[tokio::test]
    async fn test_test_record_respects_pause() {
        let h = harness(&[10]);
        let sink = RecordingSink::default();

        h.service.pause_for(GUILD, 5).await.unwrap();
        assert_eq!(
            h.service.send_test_record(GUILD, &sink).await.unwrap(),
            DispatchOutcome::Paused
        );

        h.service.unpause(GUILD).await.unwrap();
        h.service.send_test_record(GUILD, &sink).await.unwrap();
        assert_eq!(sink.sent()[0].1.kind, RecordKind::Test);
    }

    #[tokio::test]
    async fn test_failed_pause_clear_still_delivers() {
        let h = harness(&[10]);
        let feed = ScriptedFeed::with_entries(vec![]);
        let sink = RecordingSink::default();

        h.service.pause_for(GUILD, 10).await.unwrap();
        h.clock.advance(Duration::minutes(11));
        h.store.failing.store(true, Ordering::SeqCst);

        let outcome = h
            .service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Delivered(_)));
        assert_eq!(sink.sent().len(), 1);
        // The stored pause is untouched; the next event clears it again.
        assert!(h.store.configs.get(&GUILD).unwrap().paused_until.is_some());
    }

    #[tokio::test]
    async fn test_unsaved_defaults_do_not_block_events() {
        let h = harness(&[]);
        let feed = ScriptedFeed::with_entries(vec![]);
        let sink = RecordingSink::default();
        h.store.failing.store(true, Ordering::SeqCst);
        let mut other_guild = message("hello");
        other_guild.guild_id = 999;

        let outcome = h
            .service
            .handle_delete(other_guild, &feed, &sink)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Delivered(DeliveryReport::default()));
        assert!(!h.store.configs.contains_key(&999));
    }

    #[tokio::test]
    async fn test_bulk_ignores_exemptions() {
        let h = harness(&[10]);
        h.service.add_exempt_role(GUILD, 7).await.unwrap();
        h.service
            .add_exempt_text(GUILD, "one".into())
            .await
            .unwrap();
        let feed = ScriptedFeed::with_entries(vec![]);
        let sink = RecordingSink::default();
        let bulk = BulkDeletion {
            guild_id: GUILD,
            channel_id: 42,
            messages: vec![message("one"), message("two")],
        };

        let outcome = h
            .service
            .handle_bulk_delete(bulk, &feed, &sink)
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Delivered(_)));
        let record = &sink.sent()[0].1;
        assert_eq!(record.field_value("Messages Deleted"), Some("2"));
        assert_eq!(record.attachment.as_ref().unwrap().content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_pause_during_attribution_stops_delivery() {
        let h = harness(&[10]);
        let feed = PausingFeed {
            store: Arc::clone(&h.store),
            until: base_time() + Duration::minutes(5),
        };
        let sink = RecordingSink::default();

        let outcome = h
            .service
            .handle_delete(message("hello"), &feed, &sink)
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Paused);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_audit_log_read_after_settle_delay() {
        let h = harness_with_policy(&[10], AttributionPolicy::default());
        let feed = ScriptedFeed::with_entries(vec![delete_entry(MODERATOR, AUTHOR, 2_000)]);
        let sink = RecordingSink::default();
        let started = tokio::time::Instant::now();

        let (outcome, queries_before_delay) = tokio::join!(
            h.service.handle_delete(message("hello"), &feed, &sink),
            async {
                tokio::time::sleep(std::time::Duration::from_millis(900)).await;
                feed.query_count()
            }
        );

        assert_eq!(queries_before_delay, 0);
        assert!(started.elapsed() >= std::time::Duration::from_secs(1));
        assert!(matches!(outcome.unwrap(), DispatchOutcome::Delivered(_)));
        assert_eq!(feed.query_count(), 1);
        assert_eq!(sink.sent()[0].1.field_value("Deleted By"), Some("<@200>"));
    }

    #[tokio::test]
    async fn test_attachment_only_edit_is_logged() {
        let h = harness(&[10]);
        let sink = RecordingSink::default();
        let mut after = message("hello");
        after.attachments = vec!["https://cdn.example/cat.png".to_string()];
        let edit = MessageEdit {
            before: message("hello"),
            after,
        };

        let outcome = h.service.handle_edit(edit, &sink).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Delivered(_)));
        assert_eq!(sink.sent()[0].1.kind, RecordKind::MessageEdited);
    }
}
