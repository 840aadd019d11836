//! Periodically optimizes the store after removals

use async_trait::async_trait;
use keepsake_plugin::{Plugin, PluginMetadata, PluginResult};
use std::any::Any;
use std::sync::Arc;

use super::{plugin_metadata, roll, PluginOptions, StoragePlugin};
use crate::store::CacheStore;
use crate::CacheResult;

/// After a successful removal, optimizes the store with probability
/// `1 / optimizing_factor`.
pub struct OptimizeByFactor {
    metadata: PluginMetadata,
    optimizing_factor: u32,
}

impl OptimizeByFactor {
    pub const ID: &'static str = "optimize_by_factor";

    pub fn new(options: &PluginOptions) -> Self {
        Self {
            metadata: plugin_metadata(
                Self::ID,
                "OptimizeByFactor",
                "Optimizes the store every n-th removal on average",
            ),
            optimizing_factor: options.optimizing_factor,
        }
    }

    pub fn optimizing_factor(&self) -> u32 {
        self.optimizing_factor
    }

    pub fn factory(options: &serde_json::Value) -> PluginResult<Arc<dyn StoragePlugin>> {
        let options = PluginOptions::from_value(Self::ID, options)?;
        Ok(Arc::new(Self::new(&options)))
    }
}

impl Plugin for OptimizeByFactor {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl StoragePlugin for OptimizeByFactor {
    async fn post_remove(&self, store: &dyn CacheStore, _key: &str) -> CacheResult<()> {
        if roll(self.optimizing_factor) {
            store.optimize().await?;
            tracing::debug!(target: "pluggable_store", "Optimized store");
        }
        Ok(())
    }
}
