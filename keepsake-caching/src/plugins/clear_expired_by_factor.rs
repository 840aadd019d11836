//! Periodically sweeps expired entries after writes

use async_trait::async_trait;
use keepsake_plugin::{Plugin, PluginMetadata, PluginResult};
use std::any::Any;
use std::sync::Arc;

use super::{plugin_metadata, roll, PluginOptions, StoragePlugin};
use crate::store::CacheStore;
use crate::CacheResult;

/// After a successful write, clears expired entries with probability
/// `1 / clearing_factor`.
pub struct ClearExpiredByFactor {
    metadata: PluginMetadata,
    clearing_factor: u32,
}

impl ClearExpiredByFactor {
    pub const ID: &'static str = "clear_expired_by_factor";

    pub fn new(options: &PluginOptions) -> Self {
        Self {
            metadata: plugin_metadata(
                Self::ID,
                "ClearExpiredByFactor",
                "Clears expired entries every n-th write on average",
            ),
            clearing_factor: options.clearing_factor,
        }
    }

    pub fn clearing_factor(&self) -> u32 {
        self.clearing_factor
    }

    pub fn factory(options: &serde_json::Value) -> PluginResult<Arc<dyn StoragePlugin>> {
        let options = PluginOptions::from_value(Self::ID, options)?;
        Ok(Arc::new(Self::new(&options)))
    }
}

impl Plugin for ClearExpiredByFactor {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl StoragePlugin for ClearExpiredByFactor {
    async fn post_set(&self, store: &dyn CacheStore, _key: &str) -> CacheResult<()> {
        if roll(self.clearing_factor) {
            let cleared = store.clear_expired().await?;
            tracing::debug!(target: "pluggable_store", cleared, "Cleared expired entries");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::InMemoryStore;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_factor_one_always_clears() {
        let store = InMemoryStore::with_ttl(Duration::from_millis(10));
        store.set("old", json!(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let plugin = ClearExpiredByFactor::factory(&json!({"clearing_factor": 1})).unwrap();
        plugin.post_set(&store, "new").await.unwrap();

        assert_eq!(store.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_factor_zero_never_clears() {
        let store = InMemoryStore::with_ttl(Duration::from_millis(10));
        store.set("old", json!(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let plugin = ClearExpiredByFactor::new(&PluginOptions::default());
        assert_eq!(plugin.clearing_factor(), 0);
        plugin.post_set(&store, "new").await.unwrap();

        assert_eq!(store.stats().await.unwrap().evictions, 0);
    }
}
