// Core moderation log module - attribution, exemptions, pause window and
// record building. Following the same pattern as the other core modules.

pub mod attribution;
pub mod clock;
pub mod config_store;
pub mod exemption;
pub mod message_tracker;
pub mod modlog_models;
pub mod modlog_service;
pub mod pause_gate;
pub mod record_builder;

pub use attribution::{AttributionPolicy, AuditAction, AuditEntry, AuditFeed, FeedError};
pub use config_store::{ConfigStore, StoreError};
pub use modlog_models::*;
pub use modlog_service::*;
pub use record_builder::{DetachedFile, LogRecord, RecordKind};
