//! Backing store configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Adapter name, resolved through the adapter registry (e.g. "memory", "moka")
    #[serde(default = "default_adapter")]
    pub adapter: String,

    /// Maximum number of entries, if the adapter bounds its size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<u64>,

    /// Time-to-live applied to every entry
    #[serde(
        with = "crate::domains::utils::serde_duration_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ttl: Option<Duration>,

    /// Storage plugins attached to the store, in order
    #[serde(default)]
    pub plugins: Vec<StorePluginConfig>,
}

/// A storage plugin attached to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePluginConfig {
    /// Plugin name; any registered alias spelling is accepted
    pub name: String,

    /// Options handed to the plugin factory
    #[serde(default)]
    pub options: serde_json::Value,
}

impl StorePluginConfig {
    /// Plugin with no options
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: serde_json::Value::Null,
        }
    }

    /// Plugin with options
    pub fn with_options(name: impl Into<String>, options: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
            max_capacity: None,
            ttl: None,
            plugins: Vec::new(),
        }
    }
}

impl StoreConfig {
    /// Options passed to the adapter factory
    pub fn adapter_options(&self) -> serde_json::Value {
        let mut options = serde_json::Map::new();
        if let Some(capacity) = self.max_capacity {
            options.insert("max_capacity".to_string(), capacity.into());
        }
        if let Some(ttl) = self.ttl {
            options.insert("ttl".to_string(), ttl.as_secs().into());
        }
        serde_json::Value::Object(options)
    }
}

impl Validatable for StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.adapter, "adapter", self.domain_name())?;

        if let Some(capacity) = self.max_capacity {
            validate_positive(capacity, "max_capacity", self.domain_name())?;
        }

        if let Some(ttl) = self.ttl {
            if ttl.is_zero() {
                return Err(self.validation_error("ttl must be greater than 0"));
            }
        }

        for plugin in &self.plugins {
            validate_required_string(&plugin.name, "plugins.name", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "store"
    }
}

fn default_adapter() -> String {
    "memory".to_string()
}
