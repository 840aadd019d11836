//! Moka-backed store

use async_trait::async_trait;
use keepsake_plugin::{Plugin, PluginMetadata, PluginResult, PluginType, PluginVersion};
use moka::future::Cache as MokaInner;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{adapter_capabilities, AdapterOptions};
use crate::stats::{SharedStatsCollector, StatsCollector};
use crate::store::{CacheStore, CallValue, StorageAdapter};
use crate::{CacheResult, CacheStats};

/// Default entry limit when none is configured
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Store backed by a concurrent `moka` cache.
///
/// Capacity and TTL are fixed at construction; eviction runs inside moka.
pub struct MokaStore {
    metadata: PluginMetadata,
    inner: MokaInner<String, CallValue>,
    stats: SharedStatsCollector,
}

impl MokaStore {
    /// Canonical adapter name
    pub const ADAPTER_ID: &'static str = "moka";

    /// Create a store holding at most `max_capacity` entries
    pub fn new(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Start building a store
    pub fn builder() -> MokaStoreBuilder {
        MokaStoreBuilder::new()
    }

    /// Adapter factory for the adapter registry
    pub fn factory(options: &serde_json::Value) -> PluginResult<Arc<dyn StorageAdapter>> {
        let options = AdapterOptions::from_value(Self::ADAPTER_ID, options)?;
        let mut builder =
            Self::builder().max_capacity(options.max_capacity.unwrap_or(DEFAULT_MAX_CAPACITY));
        if let Some(ttl) = options.ttl() {
            builder = builder.time_to_live(ttl);
        }
        Ok(Arc::new(builder.build()))
    }
}

#[async_trait]
impl CacheStore for MokaStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CallValue>> {
        let start = Instant::now();

        let result = self.inner.get(key).await;
        if result.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }

        self.stats.record_get_latency(start);
        Ok(result)
    }

    async fn set(&self, key: &str, value: CallValue) -> CacheResult<()> {
        let start = Instant::now();

        self.inner.insert(key.to_string(), value).await;
        self.stats.record_set();

        self.stats.record_set_latency(start);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let removed = self.inner.remove(key).await.is_some();
        if removed {
            self.stats.record_removal();
        }
        Ok(removed)
    }

    async fn clear(&self) -> CacheResult<()> {
        self.stats.record_evictions(self.inner.entry_count());
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
        Ok(())
    }

    async fn clear_expired(&self) -> CacheResult<usize> {
        let before = self.inner.entry_count();
        self.inner.run_pending_tasks().await;
        let swept = before.saturating_sub(self.inner.entry_count());
        Ok(usize::try_from(swept).unwrap_or(usize::MAX))
    }

    async fn optimize(&self) -> CacheResult<()> {
        self.inner.run_pending_tasks().await;
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(usize::try_from(self.inner.entry_count()).unwrap_or(usize::MAX))
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let len = self.len().await?;
        Ok(self.stats.snapshot(len))
    }
}

impl Plugin for MokaStore {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StorageAdapter for MokaStore {
    fn into_store(self: Arc<Self>) -> Arc<dyn CacheStore> {
        self
    }
}

/// Builder for [`MokaStore`]
#[derive(Debug, Default)]
pub struct MokaStoreBuilder {
    max_capacity: Option<u64>,
    time_to_live: Option<Duration>,
    time_to_idle: Option<Duration>,
}

impl MokaStoreBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max capacity
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Set time to live
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Set time to idle
    pub fn time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }

    /// Build the store
    pub fn build(self) -> MokaStore {
        let mut builder = MokaInner::builder();

        if let Some(capacity) = self.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        if let Some(ttl) = self.time_to_live {
            builder = builder.time_to_live(ttl);
        }

        if let Some(tti) = self.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        let metadata = PluginMetadata::new(
            MokaStore::ADAPTER_ID,
            "Moka",
            PluginVersion::new(1, 0, 0),
            "Concurrent bounded store backed by moka",
            PluginType::Adapter,
        )
        .with_capabilities(adapter_capabilities());

        MokaStore {
            metadata,
            inner: builder.build(),
            stats: Arc::new(StatsCollector::new()),
        }
    }
}
