//! Store implementations

use serde::Deserialize;
use std::time::Duration;

use keepsake_plugin::{PluginCapabilities, PluginError, PluginResult};

pub mod inmemory;
#[cfg(feature = "moka")]
pub mod moka;

pub use inmemory::InMemoryStore;
#[cfg(feature = "moka")]
pub use moka::MokaStore;

/// Capability every storage adapter declares
pub const KEY_VALUE_STORE: &str = "key_value_store";

/// Options accepted by the built-in adapters
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterOptions {
    /// Maximum number of entries
    pub max_capacity: Option<u64>,
    /// Time-to-live in seconds
    pub ttl: Option<u64>,
}

impl AdapterOptions {
    /// Decode factory options; `null` means defaults
    pub fn from_value(adapter: &str, options: &serde_json::Value) -> PluginResult<Self> {
        if options.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(options.clone())
            .map_err(|e| PluginError::invalid_options(adapter, e))
    }

    /// TTL as a duration
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }
}

fn adapter_capabilities() -> PluginCapabilities {
    PluginCapabilities::default()
        .configurable()
        .with_custom_capability(KEY_VALUE_STORE, true)
}
