//! Plugin registry: name resolution, lazy construction and shared instances

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::Plugin;
use crate::error::{PluginError, PluginResult};
use crate::types::CONFIGURABLE;

/// Constructor bound to a canonical plugin name.
///
/// Receives the construction options (`Value::Null` when resolved without
/// options).
pub type PluginFactory<P> = Arc<dyn Fn(&Value) -> PluginResult<Arc<P>> + Send + Sync>;

type InstanceCell<P> = Arc<OnceCell<Arc<P>>>;

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Number of canonical names with a factory
    pub total_plugins: usize,
    /// Number of alias spellings
    pub total_aliases: usize,
    /// Number of shared instances currently held
    pub shared_instances: usize,
    /// Total calls to `resolve`
    pub resolutions: u64,
    /// Instances constructed by factories
    pub instances_created: u64,
    /// Resolutions answered from the shared instance cache
    pub shared_hits: u64,
}

/// Registry mapping plugin names to factories and, optionally, shared instances.
///
/// Aliases are listed explicitly rather than normalised, so two canonical
/// names can never collide under some casing rule. A name without an alias
/// entry is treated as canonical itself.
///
/// When a name is shared, at most one instance is constructed and published
/// for it, even when several threads resolve it at once.
pub struct PluginRegistry<P: Plugin + ?Sized> {
    /// Label used in log events
    label: String,
    /// Alias spelling -> canonical name
    aliases: RwLock<HashMap<String, String>>,
    /// Canonical name -> factory
    factories: RwLock<HashMap<String, PluginFactory<P>>>,
    /// Per-name overrides of `shared_by_default`
    shared: RwLock<HashMap<String, bool>>,
    /// Canonical name -> shared instance
    instances: Mutex<HashMap<String, InstanceCell<P>>>,
    shared_by_default: bool,
    required_capabilities: Vec<String>,
    resolutions: AtomicU64,
    instances_created: AtomicU64,
    shared_hits: AtomicU64,
}

impl<P: Plugin + ?Sized> PluginRegistry<P> {
    /// Create an empty registry that builds a fresh instance on every resolution
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            aliases: RwLock::new(HashMap::new()),
            factories: RwLock::new(HashMap::new()),
            shared: RwLock::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
            shared_by_default: false,
            required_capabilities: Vec::new(),
            resolutions: AtomicU64::new(0),
            instances_created: AtomicU64::new(0),
            shared_hits: AtomicU64::new(0),
        }
    }

    /// Reuse resolved instances unless a name opts out
    pub fn with_shared_by_default(mut self, shared: bool) -> Self {
        self.shared_by_default = shared;
        self
    }

    /// Require every resolved instance to support `capability`
    pub fn with_required_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    /// Registry label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether instances are shared unless overridden
    pub fn shared_by_default(&self) -> bool {
        self.shared_by_default
    }

    /// Capabilities checked on every resolution
    pub fn required_capabilities(&self) -> &[String] {
        &self.required_capabilities
    }

    /// Bind a factory to a canonical name.
    ///
    /// Replacing a factory drops any shared instance built by the old one.
    pub fn register_factory<F>(&self, canonical: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> PluginResult<Arc<P>> + Send + Sync + 'static,
    {
        let canonical = canonical.into();
        let replaced = self
            .factories
            .write()
            .insert(canonical.clone(), Arc::new(factory))
            .is_some();

        if replaced {
            self.instances.lock().remove(&canonical);
        }

        tracing::debug!(
            target: "plugin_registry",
            registry = %self.label,
            plugin = %canonical,
            replaced,
            "Plugin factory registered"
        );
    }

    /// Map one alias spelling to a name
    pub fn register_alias(&self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.write().insert(alias.into(), target.into());
    }

    /// Map several alias spellings to the same canonical name
    pub fn register_aliases<I, S>(&self, canonical: &str, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = self.aliases.write();
        for alias in aliases {
            table.insert(alias.into(), canonical.to_string());
        }
    }

    /// Override sharing for one name
    pub fn set_shared(&self, name: &str, shared: bool) {
        let canonical = self
            .canonical_name(name)
            .unwrap_or_else(|_| name.to_string());

        if !shared {
            self.instances.lock().remove(&canonical);
        }
        self.shared.write().insert(canonical, shared);
    }

    /// Whether resolutions of `name` reuse one instance
    pub fn is_shared(&self, name: &str) -> bool {
        let canonical = self
            .canonical_name(name)
            .unwrap_or_else(|_| name.to_string());

        self.shared
            .read()
            .get(&canonical)
            .copied()
            .unwrap_or(self.shared_by_default)
    }

    /// Follow the alias table from `name` to its canonical name
    pub fn canonical_name(&self, name: &str) -> PluginResult<String> {
        let aliases = self.aliases.read();
        let mut current = name;
        let mut hops = 0;

        while let Some(target) = aliases.get(current) {
            if target == current {
                break;
            }
            hops += 1;
            if hops > aliases.len() {
                return Err(PluginError::AliasCycle {
                    alias: name.to_string(),
                });
            }
            current = target;
        }

        Ok(current.to_string())
    }

    /// Whether `name` resolves to a registered factory
    pub fn has(&self, name: &str) -> bool {
        match self.canonical_name(name) {
            Ok(canonical) => self.factories.read().contains_key(&canonical),
            Err(_) => false,
        }
    }

    /// Resolve a plugin by name or alias.
    ///
    /// Shared names return the cached instance when one exists; otherwise the
    /// factory runs with no options. The instance must support every required
    /// capability.
    pub fn resolve(&self, name: &str) -> PluginResult<Arc<P>> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);

        let canonical = self.canonical_name(name)?;
        let factory = self.factory_for(name, &canonical)?;

        if !self.is_shared(&canonical) {
            return self.instantiate(&canonical, &factory, &Value::Null);
        }

        let cell = {
            let mut instances = self.instances.lock();
            Arc::clone(instances.entry(canonical.clone()).or_default())
        };

        if let Some(instance) = cell.get() {
            self.shared_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(instance));
        }

        // The factory is read again after the cell is taken. `register_factory`
        // swaps the factory before dropping the cell, so a cell still in the
        // map never receives an instance from a replaced factory.
        // Concurrent callers block here until the single initialiser finishes.
        let instance = cell.get_or_try_init(|| {
            let factory = self.factory_for(name, &canonical)?;
            self.instantiate(&canonical, &factory, &Value::Null)
        })?;
        Ok(Arc::clone(instance))
    }

    /// Construct a fresh instance with options. Never shared.
    ///
    /// Options other than `null` are only accepted by plugins that declare
    /// themselves configurable.
    pub fn build(&self, name: &str, options: &Value) -> PluginResult<Arc<P>> {
        let canonical = self.canonical_name(name)?;
        let factory = self.factory_for(name, &canonical)?;
        self.instantiate(&canonical, &factory, options)
    }

    /// Drop the shared instance of `name`, if any
    pub fn evict(&self, name: &str) -> bool {
        let canonical = self
            .canonical_name(name)
            .unwrap_or_else(|_| name.to_string());
        self.instances.lock().remove(&canonical).is_some()
    }

    /// Canonical names with a factory, sorted
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Alias spellings that point directly at `canonical`, sorted
    pub fn aliases_of(&self, canonical: &str) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .aliases
            .read()
            .iter()
            .filter(|(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        let shared_instances = self
            .instances
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count();

        RegistryStats {
            total_plugins: self.factories.read().len(),
            total_aliases: self.aliases.read().len(),
            shared_instances,
            resolutions: self.resolutions.load(Ordering::Relaxed),
            instances_created: self.instances_created.load(Ordering::Relaxed),
            shared_hits: self.shared_hits.load(Ordering::Relaxed),
        }
    }

    fn factory_for(&self, requested: &str, canonical: &str) -> PluginResult<PluginFactory<P>> {
        self.factories
            .read()
            .get(canonical)
            .cloned()
            .ok_or_else(|| PluginError::PluginNotFound {
                name: requested.to_string(),
            })
    }

    fn instantiate(
        &self,
        canonical: &str,
        factory: &PluginFactory<P>,
        options: &Value,
    ) -> PluginResult<Arc<P>> {
        let instance = factory(options)?;
        let capabilities = instance.capabilities();

        let missing = if !options.is_null() && !capabilities.supports(CONFIGURABLE) {
            Some(CONFIGURABLE)
        } else {
            capabilities.first_missing(&self.required_capabilities)
        };

        if let Some(capability) = missing {
            tracing::warn!(
                target: "plugin_registry",
                registry = %self.label,
                plugin = %canonical,
                capability = %capability,
                "Resolved plugin lacks a required capability"
            );
            return Err(PluginError::MissingCapability {
                name: canonical.to_string(),
                capability: capability.to_string(),
            });
        }

        self.instances_created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            target: "plugin_registry",
            registry = %self.label,
            plugin = %canonical,
            kind = %instance.metadata().plugin_type,
            "Plugin instance created"
        );

        Ok(instance)
    }
}

impl<P: Plugin + ?Sized> std::fmt::Debug for PluginRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("label", &self.label)
            .field("plugins", &self.registered_names())
            .field("shared_by_default", &self.shared_by_default)
            .field("required_capabilities", &self.required_capabilities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PluginMetadata;
    use crate::types::{PluginCapabilities, PluginType, PluginVersion};
    use serde::Deserialize;
    use std::any::Any;
    use std::sync::atomic::AtomicUsize;

    struct OptimizeByFactor {
        metadata: PluginMetadata,
        factor: u32,
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct FactorOptions {
        optimizing_factor: u32,
    }

    impl OptimizeByFactor {
        fn new(factor: u32) -> Self {
            let metadata = PluginMetadata::new(
                "optimize_by_factor",
                "OptimizeByFactor",
                PluginVersion::new(1, 0, 0),
                "Optimizes the store every n-th removal",
                PluginType::Storage,
            )
            .with_capabilities(
                PluginCapabilities::default()
                    .configurable()
                    .with_custom_capability("storage_events", true),
            );
            Self { metadata, factor }
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

    struct Bare {
        metadata: PluginMetadata,
    }

    impl Plugin for Bare {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registry(shared: bool) -> PluginRegistry<dyn Plugin> {
        let registry = PluginRegistry::<dyn Plugin>::new("test")
            .with_shared_by_default(shared)
            .with_required_capability("storage_events");

        registry.register_factory("optimize_by_factor", |options: &Value| {
            let options: FactorOptions = if options.is_null() {
                FactorOptions::default()
            } else {
                serde_json::from_value(options.clone())
                    .map_err(|e| PluginError::invalid_options("optimize_by_factor", e))?
            };
            Ok(Arc::new(OptimizeByFactor::new(options.optimizing_factor)) as Arc<dyn Plugin>)
        });
        registry.register_aliases(
            "optimize_by_factor",
            ["optimizebyfactor", "optimizeByFactor", "OptimizeByFactor"],
        );
        registry
    }

    #[test]
    fn test_alias_spellings_resolve_to_same_type() {
        let registry = registry(false);

        for name in [
            "OptimizeByFactor",
            "optimize_by_factor",
            "optimizeByFactor",
            "optimizebyfactor",
        ] {
            let plugin = registry.resolve(name).unwrap();
            assert!(plugin.as_any().downcast_ref::<OptimizeByFactor>().is_some());
            assert_eq!(plugin.metadata().id, "optimize_by_factor");
        }

        assert_eq!(
            registry.aliases_of("optimize_by_factor"),
            vec!["OptimizeByFactor", "optimizeByFactor", "optimizebyfactor"]
        );
    }

    #[test]
    fn test_unknown_name_is_resolution_error() {
        let registry = registry(false);
        let err = registry.resolve("nonexistent_plugin").err().unwrap();
        assert!(err.is_resolution_error());
        assert!(matches!(err, PluginError::PluginNotFound { ref name } if name == "nonexistent_plugin"));

        // Aliases are exact spellings, not normalised
        assert!(registry.resolve("OPTIMIZE_BY_FACTOR").is_err());
        assert!(!registry.has("OPTIMIZE_BY_FACTOR"));
        assert!(registry.has("optimizeByFactor"));
    }

    #[test]
    fn test_shared_registry_reuses_instance() {
        let registry = registry(true);
        let first = registry.resolve("optimizeByFactor").unwrap();
        let second = registry.resolve("OptimizeByFactor").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = registry.stats();
        assert_eq!(stats.instances_created, 1);
        assert_eq!(stats.shared_hits, 1);
        assert_eq!(stats.shared_instances, 1);
        assert_eq!(stats.resolutions, 2);
    }

    #[test]
    fn test_unshared_registry_builds_fresh_instances() {
        let registry = registry(false);
        let first = registry.resolve("optimize_by_factor").unwrap();
        let second = registry.resolve("optimize_by_factor").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(registry.stats().instances_created, 2);
        assert_eq!(registry.stats().shared_instances, 0);
    }

    #[test]
    fn test_per_name_shared_override() {
        let registry = registry(false);
        registry.set_shared("OptimizeByFactor", true);
        assert!(registry.is_shared("optimize_by_factor"));

        let first = registry.resolve("optimize_by_factor").unwrap();
        let second = registry.resolve("optimizebyfactor").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        registry.set_shared("optimize_by_factor", false);
        let third = registry.resolve("optimize_by_factor").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_missing_capability_is_configuration_error() {
        let registry = registry(true);
        registry.register_factory("bare", |_: &Value| {
            let metadata = PluginMetadata::new(
                "bare",
                "Bare",
                PluginVersion::new(0, 1, 0),
                "No storage hooks",
                PluginType::Custom("bare".to_string()),
            );
            Ok(Arc::new(Bare { metadata }) as Arc<dyn Plugin>)
        });

        let err = registry.resolve("bare").err().unwrap();
        assert!(err.is_configuration_error());
        assert!(matches!(
            err,
            PluginError::MissingCapability { ref capability, .. } if capability == "storage_events"
        ));
        // Nothing is published for a rejected instance
        assert_eq!(registry.stats().shared_instances, 0);
    }

    #[test]
    fn test_build_with_options_is_never_shared() {
        let registry = registry(true);
        let shared = registry.resolve("optimize_by_factor").unwrap();
        let built = registry
            .build("OptimizeByFactor", &serde_json::json!({"optimizing_factor": 7}))
            .unwrap();

        assert!(!Arc::ptr_eq(&shared, &built));
        let built = built.as_any().downcast_ref::<OptimizeByFactor>().unwrap();
        assert_eq!(built.factor, 7);

        let again = registry.resolve("optimize_by_factor").unwrap();
        assert!(Arc::ptr_eq(&shared, &again));
    }

    #[test]
    fn test_options_need_configurable_plugin() {
        let registry = registry(false);
        registry.register_factory("fixed", |_: &Value| {
            let metadata = PluginMetadata::new(
                "fixed",
                "Fixed",
                PluginVersion::new(0, 1, 0),
                "Takes no options",
                PluginType::Storage,
            )
            .with_capabilities(
                PluginCapabilities::default().with_custom_capability("storage_events", true),
            );
            Ok(Arc::new(Bare { metadata }) as Arc<dyn Plugin>)
        });

        assert!(registry.build("fixed", &Value::Null).is_ok());
        let err = registry
            .build("fixed", &serde_json::json!({"optimizing_factor": 2}))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PluginError::MissingCapability { ref capability, .. } if capability == CONFIGURABLE
        ));
    }

    #[test]
    fn test_invalid_options() {
        let registry = registry(false);
        let err = registry
            .build("optimize_by_factor", &serde_json::json!({"optimizing_factor": "often"}))
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::InvalidOptions { .. }));
    }

    #[test]
    fn test_factory_failure_propagates() {
        let registry = registry(true);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        registry.register_factory("flaky", move |_: &Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PluginError::initialization_failed("flaky", "backend unavailable"))
        });

        assert!(matches!(
            registry.resolve("flaky"),
            Err(PluginError::InitializationFailed { .. })
        ));
        // A failed construction is not cached, the next resolution retries
        assert!(registry.resolve("flaky").is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_shared_resolution_constructs_once() {
        let registry = PluginRegistry::<dyn Plugin>::new("concurrent").with_shared_by_default(true);
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&constructed);
        registry.register_factory("serializer", move |_: &Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(OptimizeByFactor::new(1)) as Arc<dyn Plugin>)
        });

        let barrier = std::sync::Barrier::new(8);
        let resolved: Vec<Arc<dyn Plugin>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        registry.resolve("serializer").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert!(resolved.iter().all(|p| Arc::ptr_eq(p, &resolved[0])));
    }

    #[test]
    fn test_alias_chains_and_cycles() {
        let registry = registry(false);
        registry.register_alias("optimizer", "OptimizeByFactor");
        assert_eq!(registry.canonical_name("optimizer").unwrap(), "optimize_by_factor");
        assert!(registry.resolve("optimizer").is_ok());

        registry.register_alias("ping", "pong");
        registry.register_alias("pong", "ping");
        let err = registry.resolve("ping").err().unwrap();
        assert!(matches!(err, PluginError::AliasCycle { .. }));
        assert!(err.is_configuration_error());

        // A spelling that aliases itself is harmless
        registry.register_alias("optimize_by_factor", "optimize_by_factor");
        assert!(registry.resolve("optimize_by_factor").is_ok());
    }

    #[test]
    fn test_replacing_factory_drops_shared_instance() {
        let registry = registry(true);
        let before = registry.resolve("optimize_by_factor").unwrap();

        registry.register_factory("optimize_by_factor", |_: &Value| {
            Ok(Arc::new(OptimizeByFactor::new(3)) as Arc<dyn Plugin>)
        });
        let after = registry.resolve("optimize_by_factor").unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(
            after.as_any().downcast_ref::<OptimizeByFactor>().unwrap().factor,
            3
        );
        assert!(registry.evict("OptimizeByFactor"));
        assert!(!registry.evict("OptimizeByFactor"));
    }

    #[test]
    fn test_shared_instance_follows_replaced_factory_under_contention() {
        let registry = registry(true);

        for round in 1..=200u32 {
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    let _ = registry.resolve("optimize_by_factor");
                });
                scope.spawn(|| {
                    registry.register_factory("optimize_by_factor", move |_: &Value| {
                        Ok(Arc::new(OptimizeByFactor::new(round)) as Arc<dyn Plugin>)
                    });
                });
            });

            let shared = registry.resolve("optimize_by_factor").unwrap();
            let factor = shared
                .as_any()
                .downcast_ref::<OptimizeByFactor>()
                .unwrap()
                .factor;
            assert_eq!(factor, round, "stale shared instance in round {round}");
        }
    }

    #[test]
    fn test_registered_names() {
        let registry = registry(false);
        registry.register_factory("serializer", |_: &Value| {
            Ok(Arc::new(OptimizeByFactor::new(0)) as Arc<dyn Plugin>)
        });
        assert_eq!(
            registry.registered_names(),
            vec!["optimize_by_factor", "serializer"]
        );
        assert_eq!(registry.stats().total_plugins, 2);
        assert_eq!(registry.stats().total_aliases, 3);
    }
}
