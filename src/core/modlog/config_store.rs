use super::modlog_models::SpaceConfig;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence port for per-guild configuration.
///
/// `save_config` must either persist the whole store or leave the previous
/// state visible; callers never observe a half-applied write.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_config(&self, guild_id: u64) -> Result<Option<SpaceConfig>, StoreError>;
    async fn save_config(&self, guild_id: u64, config: SpaceConfig) -> Result<(), StoreError>;
}
