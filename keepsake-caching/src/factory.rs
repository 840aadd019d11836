//! Builds stores from configuration

use keepsake_config::{PluginsConfig, StoreConfig, Validatable};
use keepsake_plugin::PluginRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::pluggable::PluggableStore;
use crate::plugins::{storage_plugins, StoragePlugin};
use crate::store::{CacheStore, StorageAdapter};
use crate::stores::{InMemoryStore, KEY_VALUE_STORE};
use crate::{CacheError, CacheResult};

/// Registry of the built-in storage adapters under all their accepted spellings
pub fn storage_adapters() -> PluginRegistry<dyn StorageAdapter> {
    let registry =
        PluginRegistry::new("storage_adapters").with_required_capability(KEY_VALUE_STORE);

    registry.register_factory(InMemoryStore::ADAPTER_ID, InMemoryStore::factory);
    registry.register_aliases(
        InMemoryStore::ADAPTER_ID,
        ["Memory", "in_memory", "inMemory", "InMemory", "inmemory"],
    );

    #[cfg(feature = "moka")]
    {
        use crate::stores::MokaStore;

        registry.register_factory(MokaStore::ADAPTER_ID, MokaStore::factory);
        registry.register_aliases(MokaStore::ADAPTER_ID, ["Moka"]);
    }

    registry
}

/// Resolves adapters and storage plugins by name and assembles stores.
pub struct StorageFactory {
    adapters: PluginRegistry<dyn StorageAdapter>,
    plugins: PluginRegistry<dyn StoragePlugin>,
}

impl StorageFactory {
    /// Factory with the built-in adapters and plugins
    pub fn new() -> Self {
        Self {
            adapters: storage_adapters(),
            plugins: storage_plugins(),
        }
    }

    /// Factory with plugin sharing and extra aliases taken from configuration.
    ///
    /// Each alias is added to whichever registry knows its target name.
    pub fn from_config(config: &PluginsConfig) -> Self {
        let factory = Self {
            adapters: storage_adapters(),
            plugins: storage_plugins().with_shared_by_default(config.shared_by_default),
        };

        for (alias, target) in &config.aliases {
            if factory.adapters.has(target) {
                factory.adapters.register_alias(alias.as_str(), target.as_str());
            } else {
                factory.plugins.register_alias(alias.as_str(), target.as_str());
            }
        }

        factory
    }

    pub fn adapters(&self) -> &PluginRegistry<dyn StorageAdapter> {
        &self.adapters
    }

    pub fn plugins(&self) -> &PluginRegistry<dyn StoragePlugin> {
        &self.plugins
    }

    /// Build a fresh adapter
    pub fn adapter(&self, name: &str, options: &Value) -> CacheResult<Arc<dyn StorageAdapter>> {
        Ok(self.adapters.build(name, options)?)
    }

    /// Get a storage plugin.
    ///
    /// Without options the registry's sharing rules apply; with options a
    /// fresh instance is always built.
    pub fn plugin(&self, name: &str, options: &Value) -> CacheResult<Arc<dyn StoragePlugin>> {
        let plugin = if options.is_null() {
            self.plugins.resolve(name)?
        } else {
            self.plugins.build(name, options)?
        };
        Ok(plugin)
    }

    /// Build the configured adapter with its plugins attached in order
    pub fn build_pluggable(&self, config: &StoreConfig) -> CacheResult<PluggableStore> {
        config
            .validate()
            .map_err(|e| CacheError::InvalidConfiguration(e.to_string()))?;

        let adapter = self.adapter(&config.adapter, &config.adapter_options())?;
        let store = PluggableStore::new(adapter.into_store());

        for plugin in &config.plugins {
            store.add_plugin(self.plugin(&plugin.name, &plugin.options)?);
        }

        info!(
            target: "storage_factory",
            adapter = %config.adapter,
            plugins = config.plugins.len(),
            "Store built"
        );

        Ok(store)
    }

    /// Build the configured store
    pub fn build(&self, config: &StoreConfig) -> CacheResult<Arc<dyn CacheStore>> {
        Ok(Arc::new(self.build_pluggable(config)?))
    }
}

impl Default for StorageFactory {
    fn default() -> Self {
        Self::new()
    }
}
