//! Store wrapper that runs storage plugin hooks

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::plugins::{ErrorDisposition, StoragePlugin, WriteShield};
use crate::store::{CacheStore, CallValue};
use crate::{CacheError, CacheResult, CacheStats};

type PluginList = Vec<Arc<dyn StoragePlugin>>;

/// Wraps a store and runs the hooks of its attached plugins around every
/// operation.
///
/// Plugins run in the order they were attached. A failure, whether from the
/// backend or from a hook, is offered to every plugin's `on_error`; if any
/// plugin suppresses it the operation returns its empty result (a miss,
/// `false`, zero, or nothing) instead.
pub struct PluggableStore {
    inner: Arc<dyn CacheStore>,
    plugins: RwLock<PluginList>,
}

impl PluggableStore {
    /// Wrap `inner` with no plugins attached
    pub fn new(inner: Arc<dyn CacheStore>) -> Self {
        Self {
            inner,
            plugins: RwLock::new(Vec::new()),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &Arc<dyn CacheStore> {
        &self.inner
    }

    /// Attach a plugin; returns false if this instance is already attached
    pub fn add_plugin(&self, plugin: Arc<dyn StoragePlugin>) -> bool {
        let mut plugins = self.plugins.write();
        if plugins.iter().any(|p| Arc::ptr_eq(p, &plugin)) {
            return false;
        }

        debug!(target: "pluggable_store", plugin = %plugin.metadata().id, "Plugin attached");
        plugins.push(plugin);
        true
    }

    /// Detach a plugin; returns false if it was not attached
    pub fn remove_plugin(&self, plugin: &Arc<dyn StoragePlugin>) -> bool {
        let mut plugins = self.plugins.write();
        let before = plugins.len();
        plugins.retain(|p| !Arc::ptr_eq(p, plugin));

        let removed = plugins.len() != before;
        if removed {
            debug!(target: "pluggable_store", plugin = %plugin.metadata().id, "Plugin detached");
        }
        removed
    }

    pub fn has_plugin(&self, plugin: &Arc<dyn StoragePlugin>) -> bool {
        self.plugins.read().iter().any(|p| Arc::ptr_eq(p, plugin))
    }

    /// Attached plugins, in order
    pub fn plugins(&self) -> Vec<Arc<dyn StoragePlugin>> {
        self.plugins.read().clone()
    }

    fn recover<T>(
        plugins: &[Arc<dyn StoragePlugin>],
        operation: &str,
        result: CacheResult<T>,
        fallback: T,
    ) -> CacheResult<T> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        // Every plugin sees the failure, even after one has suppressed it
        let suppressed = plugins
            .iter()
            .map(|plugin| plugin.on_error(&err))
            .fold(false, |suppressed, disposition| {
                suppressed || disposition == ErrorDisposition::Suppress
            });

        if suppressed {
            debug!(target: "pluggable_store", operation, error = %err, "Store failure suppressed");
            Ok(fallback)
        } else {
            warn!(target: "pluggable_store", operation, error = %err, "Store operation failed");
            Err(err)
        }
    }

    async fn try_get(&self, plugins: &[Arc<dyn StoragePlugin>], key: &str) -> CacheResult<Option<CallValue>> {
        let Some(mut value) = self.inner.get(key).await? else {
            return Ok(None);
        };
        for plugin in plugins {
            plugin.post_get(key, &mut value)?;
        }
        Ok(Some(value))
    }

    async fn try_set(&self, plugins: &[Arc<dyn StoragePlugin>], key: &str, mut value: CallValue) -> CacheResult<()> {
        for plugin in plugins {
            plugin.pre_set(key, &mut value)?;
        }

        let shield = plugins
            .iter()
            .map(|plugin| plugin.write_shield())
            .max()
            .unwrap_or(WriteShield::None);

        // Shielding needs a runtime to detach onto; without one the write runs in place
        let runtime = match shield {
            WriteShield::None => None,
            _ => {
                let runtime = tokio::runtime::Handle::try_current().ok();
                if runtime.is_none() {
                    debug!(target: "pluggable_store", key, "No runtime to shield the write, writing in place");
                }
                runtime
            }
        };

        match (shield, runtime) {
            (WriteShield::WriteOnly, Some(runtime)) => {
                let inner = Arc::clone(&self.inner);
                let owned_key = key.to_string();
                runtime
                    .spawn(async move { inner.set(&owned_key, value).await })
                    .await
                    .map_err(|e| CacheError::BackgroundWrite(e.to_string()))??;
                run_post_set(self.inner.as_ref(), plugins, key).await
            }
            (WriteShield::WriteAndHooks, Some(runtime)) => {
                let inner = Arc::clone(&self.inner);
                let plugins = plugins.to_vec();
                let owned_key = key.to_string();
                runtime
                    .spawn(async move {
                        inner.set(&owned_key, value).await?;
                        run_post_set(inner.as_ref(), &plugins, &owned_key).await
                    })
                    .await
                    .map_err(|e| CacheError::BackgroundWrite(e.to_string()))?
            }
            _ => {
                self.inner.set(key, value).await?;
                run_post_set(self.inner.as_ref(), plugins, key).await
            }
        }
    }

    async fn try_remove(&self, plugins: &[Arc<dyn StoragePlugin>], key: &str) -> CacheResult<bool> {
        let removed = self.inner.remove(key).await?;
        if removed {
            for plugin in plugins {
                plugin.post_remove(self.inner.as_ref(), key).await?;
            }
        }
        Ok(removed)
    }
}

async fn run_post_set(store: &dyn CacheStore, plugins: &[Arc<dyn StoragePlugin>], key: &str) -> CacheResult<()> {
    for plugin in plugins {
        plugin.post_set(store, key).await?;
    }
    Ok(())
}

#[async_trait]
impl CacheStore for PluggableStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CallValue>> {
        let plugins = self.plugins();
        let result = self.try_get(&plugins, key).await;
        Self::recover(&plugins, "get", result, None)
    }

    async fn set(&self, key: &str, value: CallValue) -> CacheResult<()> {
        let plugins = self.plugins();
        let result = self.try_set(&plugins, key, value).await;
        Self::recover(&plugins, "set", result, ())
    }

    async fn has(&self, key: &str) -> CacheResult<bool> {
        let plugins = self.plugins();
        let result = self.inner.has(key).await;
        Self::recover(&plugins, "has", result, false)
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        let plugins = self.plugins();
        let result = self.try_remove(&plugins, key).await;
        Self::recover(&plugins, "remove", result, false)
    }

    async fn clear(&self) -> CacheResult<()> {
        let plugins = self.plugins();
        let result = self.inner.clear().await;
        Self::recover(&plugins, "clear", result, ())
    }

    async fn clear_expired(&self) -> CacheResult<usize> {
        let plugins = self.plugins();
        let result = self.inner.clear_expired().await;
        Self::recover(&plugins, "clear_expired", result, 0)
    }

    async fn optimize(&self) -> CacheResult<()> {
        let plugins = self.plugins();
        let result = self.inner.optimize().await;
        Self::recover(&plugins, "optimize", result, ())
    }

    async fn len(&self) -> CacheResult<usize> {
        let plugins = self.plugins();
        let result = self.inner.len().await;
        Self::recover(&plugins, "len", result, 0)
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let plugins = self.plugins();
        let result = self.inner.stats().await;
        Self::recover(&plugins, "stats", result, CacheStats::default())
    }
}

impl std::fmt::Debug for PluggableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plugins: Vec<String> = self
            .plugins
            .read()
            .iter()
            .map(|plugin| plugin.metadata().id.clone())
            .collect();
        f.debug_struct("PluggableStore")
            .field("plugins", &plugins)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{
        ClearExpiredByFactor, ExceptionHandler, IgnoreUserAbort, PluginOptions, Serializer,
    };
    use crate::stores::InMemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<CallValue>> {
            Err(CacheError::backend("unreachable"))
        }

        async fn set(&self, _key: &str, _value: CallValue) -> CacheResult<()> {
            Err(CacheError::backend("unreachable"))
        }

        async fn remove(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::backend("unreachable"))
        }

        async fn clear(&self) -> CacheResult<()> {
            Err(CacheError::backend("unreachable"))
        }

        async fn len(&self) -> CacheResult<usize> {
            Err(CacheError::backend("unreachable"))
        }

        async fn stats(&self) -> CacheResult<CacheStats> {
            Err(CacheError::backend("unreachable"))
        }
    }

    /// Store whose writes take a while to land
    #[derive(Default)]
    struct SlowStore {
        inner: InMemoryStore,
    }

    #[async_trait]
    impl CacheStore for SlowStore {
        async fn get(&self, key: &str) -> CacheResult<Option<CallValue>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: CallValue) -> CacheResult<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> CacheResult<bool> {
            self.inner.remove(key).await
        }

        async fn clear(&self) -> CacheResult<()> {
            self.inner.clear().await
        }

        async fn len(&self) -> CacheResult<usize> {
            self.inner.len().await
        }

        async fn stats(&self) -> CacheResult<CacheStats> {
            self.inner.stats().await
        }
    }

    fn lenient_handler() -> ExceptionHandler {
        ExceptionHandler::new(&PluginOptions {
            throw_exceptions: false,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_plugin_management() {
        let store = PluggableStore::new(Arc::new(InMemoryStore::new()));
        let serializer: Arc<dyn StoragePlugin> = Arc::new(Serializer::new());
        let handler: Arc<dyn StoragePlugin> = Arc::new(lenient_handler());

        assert!(store.add_plugin(Arc::clone(&serializer)));
        assert!(!store.add_plugin(Arc::clone(&serializer)));
        assert!(store.add_plugin(Arc::clone(&handler)));
        assert!(store.has_plugin(&serializer));

        let ids: Vec<String> = store
            .plugins()
            .iter()
            .map(|p| p.metadata().id.clone())
            .collect();
        assert_eq!(ids, vec!["serializer", "exception_handler"]);

        assert!(store.remove_plugin(&serializer));
        assert!(!store.remove_plugin(&serializer));
        assert!(!store.has_plugin(&serializer));
        assert_eq!(store.plugins().len(), 1);
    }

    #[tokio::test]
    async fn test_serializer_stores_text() {
        let inner = Arc::new(InMemoryStore::new());
        let store = PluggableStore::new(inner.clone());
        store.add_plugin(Arc::new(Serializer::new()));

        let value = json!({"rows": [1, 2, 3], "next": null});
        store.set("page", value.clone()).await.unwrap();

        let raw = inner.get("page").await.unwrap().unwrap();
        assert!(raw.is_string());
        assert_eq!(store.get("page").await.unwrap(), Some(value));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failures_propagate_without_handler() {
        let store = PluggableStore::new(Arc::new(FailingStore));
        assert!(matches!(
            store.get("k").await,
            Err(CacheError::BackendError(_))
        ));
        assert!(store.set("k", json!(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_suppressed_failures_become_empty_results() {
        let store = PluggableStore::new(Arc::new(FailingStore));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        store.add_plugin(Arc::new(
            lenient_handler().with_callback(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ));

        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", json!(1)).await.unwrap();
        assert!(!store.remove("k").await.unwrap());
        assert!(!store.has("k").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_hook_failure_is_offered_to_handler() {
        let inner = Arc::new(InMemoryStore::new());
        inner.set("legacy", json!(42)).await.unwrap();

        let store = PluggableStore::new(inner);
        store.add_plugin(Arc::new(Serializer::new()));
        assert!(matches!(
            store.get("legacy").await,
            Err(CacheError::DeserializationError(_))
        ));

        store.add_plugin(Arc::new(lenient_handler()));
        assert_eq!(store.get("legacy").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_expired_runs_after_set() {
        let inner = Arc::new(InMemoryStore::with_ttl(Duration::from_millis(10)));
        let store = PluggableStore::new(inner.clone());
        store.add_plugin(Arc::new(ClearExpiredByFactor::new(&PluginOptions {
            clearing_factor: 1,
            ..Default::default()
        })));

        store.set("a", json!(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.set("b", json!(2)).await.unwrap();

        assert_eq!(inner.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_abort_shielded_write() {
        let inner = Arc::new(SlowStore::default());
        let store = PluggableStore::new(inner.clone());
        store.add_plugin(Arc::new(IgnoreUserAbort::new(&PluginOptions::default())));

        let attempt = tokio::time::timeout(Duration::from_millis(10), store.set("k", json!(1))).await;
        assert!(attempt.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(inner.get("k").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_dropped_caller_aborts_unshielded_write() {
        let inner = Arc::new(SlowStore::default());
        let store = PluggableStore::new(inner.clone());

        let attempt = tokio::time::timeout(Duration::from_millis(10), store.set("k", json!(1))).await;
        assert!(attempt.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(inner.get("k").await.unwrap(), None);
    }

    #[test]
    fn test_shielded_write_outside_runtime_runs_in_place() {
        use std::future::Future;
        use std::task::{Context, Poll, Waker};

        for exit_on_abort in [true, false] {
            let inner = Arc::new(InMemoryStore::new());
            let store = PluggableStore::new(inner.clone());
            store.add_plugin(Arc::new(IgnoreUserAbort::new(&PluginOptions {
                exit_on_abort,
                ..Default::default()
            })));

            let mut cx = Context::from_waker(Waker::noop());
            let mut write = store.set("k", json!(1));
            assert!(matches!(write.as_mut().poll(&mut cx), Poll::Ready(Ok(()))));

            let mut read = inner.get("k");
            assert!(matches!(
                read.as_mut().poll(&mut cx),
                Poll::Ready(Ok(Some(ref value))) if *value == json!(1)
            ));
        }
    }
}
