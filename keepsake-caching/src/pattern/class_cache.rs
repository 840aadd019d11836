//! Method-result cache around a target object

use async_trait::async_trait;
use keepsake_config::PatternConfig;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::errors::{PatternError, PatternResult};
use crate::key::{callable_identity, generate_callback_key};
use crate::policy::{should_cache, PatternOptions};
use crate::store::{CacheStore, CallValue};
use crate::target::{CacheTarget, StaticMembers};

/// Caches the results of calls made through it to a wrapped target.
///
/// Whether a method is cached is decided by its [`PatternOptions`]. Cached
/// calls are keyed on the target's type name, the lower-cased method name and
/// the arguments.
pub struct ClassCache<T: ?Sized> {
    target: Arc<T>,
    store: Arc<dyn CacheStore>,
    options: PatternOptions,
}

impl<T: CacheTarget + ?Sized> ClassCache<T> {
    /// Wrap `target`, caching into `store`
    pub fn new(target: Arc<T>, store: Arc<dyn CacheStore>, options: PatternOptions) -> Self {
        Self {
            target,
            store,
            options,
        }
    }

    pub fn builder() -> ClassCacheBuilder<T> {
        ClassCacheBuilder::new()
    }

    /// Wrap `target` using the pattern section of the configuration
    pub fn from_config(target: Arc<T>, store: Arc<dyn CacheStore>, config: &PatternConfig) -> Self {
        Self::new(target, store, PatternOptions::from(config))
    }

    pub fn target(&self) -> &Arc<T> {
        &self.target
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn options(&self) -> &PatternOptions {
        &self.options
    }

    /// Call `method` on the target, answering from the store when possible.
    ///
    /// On a miss the target is invoked and a successful result is written
    /// back; failures are returned as-is and never stored. A store failure
    /// is returned as [`PatternError::Store`] rather than treated as a miss.
    ///
    /// Misses on the same key are not coordinated: concurrent callers may
    /// each invoke the target, and the last write wins.
    pub async fn call(&self, method: &str, args: &[CallValue]) -> PatternResult<CallValue> {
        let method = method.to_lowercase();

        if !should_cache(&method, &self.options) {
            trace!(target: "class_cache", method = %method, "Method not cached, invoking target");
            return self.invoke_target(&method, args).await;
        }

        let key = self.key_for(&method, args);

        if let Some(value) = self.store.get(&key).await? {
            debug!(target: "class_cache", method = %method, key = %key, "Cache hit");
            return Ok(value);
        }

        debug!(target: "class_cache", method = %method, key = %key, "Cache miss");
        let value = self.invoke_target(&method, args).await?;
        self.store.set(&key, value.clone()).await?;

        Ok(value)
    }

    /// Key under which a call of `method` with `args` is stored
    pub fn generate_key(&self, method: &str, args: &[CallValue]) -> String {
        self.key_for(&method.to_lowercase(), args)
    }

    fn key_for(&self, method: &str, args: &[CallValue]) -> String {
        let callable = callable_identity(self.target.type_name(), method);
        generate_callback_key(&callable, args)
    }

    async fn invoke_target(&self, method: &str, args: &[CallValue]) -> PatternResult<CallValue> {
        self.target
            .invoke(method, args)
            .await
            .map_err(PatternError::Invocation)
    }
}

impl<T: StaticMembers + ?Sized> ClassCache<T> {
    /// Read a static member of the target
    pub fn get_static(&self, name: &str) -> Option<CallValue> {
        self.target.get_member(name)
    }

    /// Write a static member of the target
    pub fn set_static(&self, name: &str, value: CallValue) {
        self.target.set_member(name, value)
    }

    /// Whether the target has a static member
    pub fn has_static(&self, name: &str) -> bool {
        self.target.has_member(name)
    }

    /// Remove a static member of the target
    pub fn remove_static(&self, name: &str) -> Option<CallValue> {
        self.target.remove_member(name)
    }
}

#[async_trait]
impl<T: CacheTarget + ?Sized> CacheTarget for ClassCache<T> {
    fn type_name(&self) -> &str {
        self.target.type_name()
    }

    async fn invoke(&self, method: &str, args: &[CallValue]) -> anyhow::Result<CallValue> {
        match self.call(method, args).await {
            Ok(value) => Ok(value),
            Err(PatternError::Invocation(err)) => Err(err),
            Err(err) => Err(err.into()),
        }
    }
}

impl<T: StaticMembers + ?Sized> StaticMembers for ClassCache<T> {
    fn get_member(&self, name: &str) -> Option<CallValue> {
        self.target.get_member(name)
    }

    fn set_member(&self, name: &str, value: CallValue) {
        self.target.set_member(name, value)
    }

    fn has_member(&self, name: &str) -> bool {
        self.target.has_member(name)
    }

    fn remove_member(&self, name: &str) -> Option<CallValue> {
        self.target.remove_member(name)
    }
}

impl<T: ?Sized> std::fmt::Debug for ClassCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassCache")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ClassCache`]; target and store are required
pub struct ClassCacheBuilder<T: ?Sized> {
    target: Option<Arc<T>>,
    store: Option<Arc<dyn CacheStore>>,
    options: PatternOptions,
}

impl<T: CacheTarget + ?Sized> ClassCacheBuilder<T> {
    pub fn new() -> Self {
        Self {
            target: None,
            store: None,
            options: PatternOptions::default(),
        }
    }

    pub fn target(mut self, target: Arc<T>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn options(mut self, options: PatternOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache_by_default(mut self, cache_by_default: bool) -> Self {
        self.options.set_cache_by_default(cache_by_default);
        self
    }

    pub fn cache_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.options.set_cache_methods(methods);
        self
    }

    pub fn non_cache_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.options.set_non_cache_methods(methods);
        self
    }

    /// Build the cache, failing if the target or store is missing
    pub fn build(self) -> PatternResult<ClassCache<T>> {
        let target = self
            .target
            .ok_or_else(|| PatternError::configuration("no target to wrap"))?;
        let store = self
            .store
            .ok_or_else(|| PatternError::configuration("no store configured"))?;

        Ok(ClassCache::new(target, store, self.options))
    }
}

impl<T: CacheTarget + ?Sized> Default for ClassCacheBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
