use crate::core::modlog::{ConfigStore, SpaceConfig, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// JSON file store for moderation log config. The whole file is a map:
/// { guild_id: SpaceConfig }, loaded once and rewritten on every save.
pub struct JsonConfigStore {
    path: PathBuf,
    cache: RwLock<HashMap<u64, SpaceConfig>>,
}

impl JsonConfigStore {
    /// Load the store from `path`. A missing file is an empty store.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let map = match fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => HashMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %path.display(), guilds = map.len(), "Loaded moderation log config");
        Ok(Self {
            path,
            cache: RwLock::new(map),
        })
    }

    // Write to a sibling temp file and rename over the original so a failed
    // write never leaves a truncated config behind.
    async fn persist(&self, map: &HashMap<u64, SpaceConfig>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let text = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn get_config(&self, guild_id: u64) -> Result<Option<SpaceConfig>, StoreError> {
        let cache = self.cache.read().await;
        Ok(cache.get(&guild_id).cloned())
    }

    async fn save_config(&self, guild_id: u64, config: SpaceConfig) -> Result<(), StoreError> {
        // Hold the write lock across the file write so saves are serialized
        // and the cache only changes once the file has.
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        next.insert(guild_id, config);
        self.persist(&next).await?;
        *cache = next;
        Ok(())
    }
}
