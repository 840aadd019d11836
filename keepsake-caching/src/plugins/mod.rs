//! Storage plugins
//!
//! Plugins hook into the operations of a [`PluggableStore`](crate::PluggableStore):
//! they can rewrite values on the way in and out, react after writes and
//! removals, and decide whether a failure reaches the caller.

use async_trait::async_trait;
use keepsake_plugin::{
    Plugin, PluginCapabilities, PluginError, PluginMetadata, PluginRegistry, PluginResult,
    PluginType, PluginVersion,
};
use serde::{Deserialize, Serialize};

use crate::store::{CacheStore, CallValue};
use crate::{CacheError, CacheResult};

pub mod clear_expired_by_factor;
pub mod exception_handler;
pub mod ignore_user_abort;
pub mod optimize_by_factor;
pub mod serializer;

pub use clear_expired_by_factor::ClearExpiredByFactor;
pub use exception_handler::{ErrorCallback, ExceptionHandler};
pub use ignore_user_abort::IgnoreUserAbort;
pub use optimize_by_factor::OptimizeByFactor;
pub use serializer::Serializer;

/// Capability every storage plugin declares
pub const STORAGE_EVENTS: &str = "storage_events";

/// What to do with a failed store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Return the error to the caller
    Propagate,
    /// Swallow the error and return the operation's empty result
    Suppress,
}

/// How much of a write survives the caller going away
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WriteShield {
    /// Writes run in the caller's task
    None,
    /// The backend write runs on its own task; follow-up hooks stay with the caller
    WriteOnly,
    /// The backend write and every follow-up hook run on their own task
    WriteAndHooks,
}

/// Hooks run by a pluggable store around each operation.
///
/// Every hook has a no-op default so plugins implement only what they need.
#[async_trait]
pub trait StoragePlugin: Plugin {
    /// Rewrite a value before it is stored
    fn pre_set(&self, _key: &str, _value: &mut CallValue) -> CacheResult<()> {
        Ok(())
    }

    /// React to a successful write
    async fn post_set(&self, _store: &dyn CacheStore, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    /// Rewrite a value read from the store
    fn post_get(&self, _key: &str, _value: &mut CallValue) -> CacheResult<()> {
        Ok(())
    }

    /// React to a successful removal
    async fn post_remove(&self, _store: &dyn CacheStore, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    /// Decide whether a failure reaches the caller
    fn on_error(&self, _error: &CacheError) -> ErrorDisposition {
        ErrorDisposition::Propagate
    }

    /// Whether writes keep running after the caller is dropped
    fn write_shield(&self) -> WriteShield {
        WriteShield::None
    }
}

/// Options shared by the built-in plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginOptions {
    /// Clear expired entries on average once every n writes; 0 disables
    pub clearing_factor: u32,
    /// Optimize the store on average once every n removals; 0 disables
    pub optimizing_factor: u32,
    /// Let failures reach the caller
    pub throw_exceptions: bool,
    /// Stop after the backend write when the caller has gone away
    pub exit_on_abort: bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            clearing_factor: 0,
            optimizing_factor: 0,
            throw_exceptions: true,
            exit_on_abort: true,
        }
    }
}

impl PluginOptions {
    /// Decode factory options for `plugin`; `null` means defaults
    pub fn from_value(plugin: &str, options: &serde_json::Value) -> PluginResult<Self> {
        if options.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(options.clone()).map_err(|e| PluginError::invalid_options(plugin, e))
    }
}

/// Registry of the built-in storage plugins under all their accepted spellings.
///
/// Instances are not shared, so each store gets its own plugin objects.
pub fn storage_plugins() -> PluginRegistry<dyn StoragePlugin> {
    let registry = PluginRegistry::new("storage_plugins").with_required_capability(STORAGE_EVENTS);

    registry.register_factory(ClearExpiredByFactor::ID, ClearExpiredByFactor::factory);
    registry.register_aliases(
        ClearExpiredByFactor::ID,
        ["clearexpiredbyfactor", "clearExpiredByFactor", "ClearExpiredByFactor"],
    );

    registry.register_factory(ExceptionHandler::ID, ExceptionHandler::factory);
    registry.register_aliases(
        ExceptionHandler::ID,
        ["exceptionhandler", "exceptionHandler", "ExceptionHandler"],
    );

    registry.register_factory(IgnoreUserAbort::ID, IgnoreUserAbort::factory);
    registry.register_aliases(
        IgnoreUserAbort::ID,
        ["ignoreuserabort", "ignoreUserAbort", "IgnoreUserAbort"],
    );

    registry.register_factory(OptimizeByFactor::ID, OptimizeByFactor::factory);
    registry.register_aliases(
        OptimizeByFactor::ID,
        ["optimizebyfactor", "optimizeByFactor", "OptimizeByFactor"],
    );

    registry.register_factory(Serializer::ID, Serializer::factory);
    registry.register_aliases(Serializer::ID, ["Serializer"]);

    registry
}

fn plugin_metadata(id: &str, name: &str, description: &str) -> PluginMetadata {
    PluginMetadata::new(
        id,
        name,
        PluginVersion::new(1, 0, 0),
        description,
        PluginType::Storage,
    )
    .with_capabilities(
        PluginCapabilities::default()
            .configurable()
            .with_custom_capability(STORAGE_EVENTS, true),
    )
}

/// Roll a 1-in-`factor` chance; a factor of 0 never fires
fn roll(factor: u32) -> bool {
    factor > 0 && fastrand::u32(1..=factor) == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_plugin_options_defaults() {
        let options = PluginOptions::from_value("serializer", &serde_json::Value::Null).unwrap();
        assert_eq!(options, PluginOptions::default());
        assert_eq!(options.clearing_factor, 0);
        assert_eq!(options.optimizing_factor, 0);
        assert!(options.throw_exceptions);
        assert!(options.exit_on_abort);
    }

    #[test]
    fn test_plugin_options_rejects_unknown_fields() {
        let err = PluginOptions::from_value(
            "clear_expired_by_factor",
            &serde_json::json!({"clearing_factor": 10, "clearing_rate": 3}),
        )
        .unwrap_err();
        assert!(matches!(err, PluginError::InvalidOptions { .. }));
    }

    #[test]
    fn test_every_spelling_resolves() {
        let registry = storage_plugins();
        let spellings: [(&str, &[&str]); 5] = [
            (
                ClearExpiredByFactor::ID,
                &["clear_expired_by_factor", "clearexpiredbyfactor", "clearExpiredByFactor", "ClearExpiredByFactor"],
            ),
            (
                ExceptionHandler::ID,
                &["exception_handler", "exceptionhandler", "exceptionHandler", "ExceptionHandler"],
            ),
            (
                IgnoreUserAbort::ID,
                &["ignore_user_abort", "ignoreuserabort", "ignoreUserAbort", "IgnoreUserAbort"],
            ),
            (
                OptimizeByFactor::ID,
                &["optimize_by_factor", "optimizebyfactor", "optimizeByFactor", "OptimizeByFactor"],
            ),
            (Serializer::ID, &["serializer", "Serializer"]),
        ];

        for (id, names) in spellings {
            for name in names {
                let plugin = registry.resolve(name).unwrap();
                assert_eq!(plugin.metadata().id, id, "{name}");
            }
        }

        assert!(registry.resolve("SERIALIZER").is_err());
        assert!(registry.resolve("Compressor").err().unwrap().is_resolution_error());
    }

    #[test]
    fn test_instances_are_not_shared() {
        let registry = storage_plugins();
        let first = registry.resolve("serializer").unwrap();
        let second = registry.resolve("Serializer").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_roll() {
        assert!(!roll(0));
        assert!(roll(1));
    }
}
