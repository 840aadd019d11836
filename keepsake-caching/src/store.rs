//! Store contract shared by every backend

use async_trait::async_trait;
use keepsake_plugin::Plugin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{CacheResult, CacheStats};

/// Values passed to and returned from cached calls
pub type CallValue = serde_json::Value;

/// Key/value store backing the class cache.
///
/// `get` distinguishes a clean miss (`Ok(None)`) from a stored `null`
/// (`Ok(Some(Value::Null))`) and from a backend failure (`Err`).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value from the store
    async fn get(&self, key: &str) -> CacheResult<Option<CallValue>>;

    /// Store a value, replacing any previous one
    async fn set(&self, key: &str, value: CallValue) -> CacheResult<()>;

    /// Check if a key exists
    async fn has(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove a value, returning whether it was present
    async fn remove(&self, key: &str) -> CacheResult<bool>;

    /// Clear all entries
    async fn clear(&self) -> CacheResult<()>;

    /// Drop expired entries, returning how many were removed
    async fn clear_expired(&self) -> CacheResult<usize> {
        Ok(0)
    }

    /// Reclaim space held by the backend
    async fn optimize(&self) -> CacheResult<()> {
        Ok(())
    }

    /// Get the number of live entries
    async fn len(&self) -> CacheResult<usize>;

    /// Check if the store is empty
    async fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Get store statistics
    async fn stats(&self) -> CacheResult<CacheStats>;
}

/// A store that can be resolved by name through the adapter registry
pub trait StorageAdapter: CacheStore + Plugin {
    /// View the adapter as a plain store
    fn into_store(self: Arc<Self>) -> Arc<dyn CacheStore>;
}

/// Stored value with its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// Entries without a deadline live until removed
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Create an entry that expires `ttl` from now
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    /// Check if the entry is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() > expires_at)
            .unwrap_or(false)
    }
}
