//! In-process hash map store

use async_trait::async_trait;
use keepsake_plugin::{Plugin, PluginMetadata, PluginResult, PluginType, PluginVersion};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{adapter_capabilities, AdapterOptions};
use crate::stats::{SharedStatsCollector, StatsCollector};
use crate::store::{CacheEntry, CacheStore, CallValue, StorageAdapter};
use crate::{CacheError, CacheResult, CacheStats};

/// Hash map store with optional TTL and entry limit.
///
/// Expired entries are dropped lazily on access and in bulk by
/// `clear_expired`. When the limit is reached, a set for a new key first
/// sweeps expired entries and fails with `CapacityExceeded` if that frees
/// nothing.
pub struct InMemoryStore {
    metadata: PluginMetadata,
    entries: RwLock<HashMap<String, CacheEntry<CallValue>>>,
    default_ttl: Option<Duration>,
    max_capacity: Option<usize>,
    stats: SharedStatsCollector,
}

impl InMemoryStore {
    /// Canonical adapter name
    pub const ADAPTER_ID: &'static str = "memory";

    /// Create an unbounded store without expiry
    pub fn new() -> Self {
        Self::with_options(&AdapterOptions::default())
    }

    /// Create a store whose entries expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        let mut store = Self::new();
        store.default_ttl = Some(ttl);
        store
    }

    /// Create a store from adapter options
    pub fn with_options(options: &AdapterOptions) -> Self {
        let metadata = PluginMetadata::new(
            Self::ADAPTER_ID,
            "InMemory",
            PluginVersion::new(1, 0, 0),
            "In-process hash map store",
            PluginType::Adapter,
        )
        .with_capabilities(adapter_capabilities());

        Self {
            metadata,
            entries: RwLock::new(HashMap::new()),
            default_ttl: options.ttl(),
            max_capacity: options
                .max_capacity
                .map(|capacity| usize::try_from(capacity).unwrap_or(usize::MAX)),
            stats: Arc::new(StatsCollector::new()),
        }
    }

    /// Adapter factory for the adapter registry
    pub fn factory(options: &serde_json::Value) -> PluginResult<Arc<dyn StorageAdapter>> {
        let options = AdapterOptions::from_value(Self::ADAPTER_ID, options)?;
        Ok(Arc::new(Self::with_options(&options)))
    }

    fn entry(&self, value: CallValue) -> CacheEntry<CallValue> {
        match self.default_ttl {
            Some(ttl) => CacheEntry::with_ttl(value, ttl),
            None => CacheEntry::new(value),
        }
    }

    fn sweep(entries: &mut HashMap<String, CacheEntry<CallValue>>) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CallValue>> {
        let start = Instant::now();

        let result = {
            let mut entries = self.entries.write();
            match entries.get(key) {
                Some(entry) if entry.is_expired() => {
                    entries.remove(key);
                    self.stats.record_evictions(1);
                    self.stats.record_miss();
                    None
                }
                Some(entry) => {
                    self.stats.record_hit();
                    Some(entry.value.clone())
                }
                None => {
                    self.stats.record_miss();
                    None
                }
            }
        };

        self.stats.record_get_latency(start);
        Ok(result)
    }

    async fn set(&self, key: &str, value: CallValue) -> CacheResult<()> {
        let start = Instant::now();

        {
            let mut entries = self.entries.write();
            if let Some(limit) = self.max_capacity {
                if !entries.contains_key(key) && entries.len() >= limit {
                    let swept = Self::sweep(&mut entries);
                    self.stats.record_evictions(swept as u64);
                    if entries.len() >= limit {
                        return Err(CacheError::CapacityExceeded(format!(
                            "memory store holds {limit} entries"
                        )));
                    }
                }
            }
            entries.insert(key.to_string(), self.entry(value));
            self.stats.record_set();
        }

        self.stats.record_set_latency(start);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let removed = self.entries.write().remove(key);
        match removed {
            Some(entry) if entry.is_expired() => {
                self.stats.record_evictions(1);
                Ok(false)
            }
            Some(_) => {
                self.stats.record_removal();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut entries = self.entries.write();
        self.stats.record_evictions(entries.len() as u64);
        entries.clear();
        Ok(())
    }

    async fn clear_expired(&self) -> CacheResult<usize> {
        let swept = Self::sweep(&mut self.entries.write());
        self.stats.record_evictions(swept as u64);
        Ok(swept)
    }

    async fn optimize(&self) -> CacheResult<()> {
        self.entries.write().shrink_to_fit();
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        let entries = self.entries.read();
        Ok(entries.values().filter(|entry| !entry.is_expired()).count())
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let len = self.len().await?;
        Ok(self.stats.snapshot(len))
    }
}

impl Plugin for InMemoryStore {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StorageAdapter for InMemoryStore {
    fn into_store(self: Arc<Self>) -> Arc<dyn CacheStore> {
        self
    }
}
