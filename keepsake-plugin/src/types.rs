//! Plugin type definitions and utilities

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Plugin type enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    /// Hooks attached to a store (serialization, housekeeping, error handling)
    Storage,
    /// A key/value store implementation
    Adapter,
    /// Custom plugin type
    Custom(String),
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage => write!(f, "storage"),
            Self::Adapter => write!(f, "adapter"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Plugin version with semantic versioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginVersion {
    /// Semantic version
    pub version: semver::Version,
}

impl PluginVersion {
    /// Create a new plugin version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            version: semver::Version::new(major, minor, patch),
        }
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

/// Capability a plugin needs before a registry will build it with options
pub const CONFIGURABLE: &str = "configurable";

/// Named capability flags checked by registries on resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginCapabilities {
    /// Plugin accepts construction options
    #[serde(default)]
    pub configurable: bool,
    /// Capabilities a registry may require, such as `storage_events`
    #[serde(default)]
    pub custom: BTreeMap<String, bool>,
}

impl PluginCapabilities {
    /// Check if a capability is supported
    pub fn supports(&self, capability: &str) -> bool {
        match capability {
            CONFIGURABLE => self.configurable,
            _ => self.custom.get(capability).copied().unwrap_or(false),
        }
    }

    /// First capability of `required` that is not supported
    pub fn first_missing<'a, S: AsRef<str>>(&self, required: &'a [S]) -> Option<&'a str> {
        required
            .iter()
            .map(|capability| capability.as_ref())
            .find(|capability| !self.supports(capability))
    }

    /// Mark the plugin as accepting options
    pub fn configurable(mut self) -> Self {
        self.configurable = true;
        self
    }

    /// Add a custom capability
    pub fn with_custom_capability(mut self, name: impl Into<String>, supported: bool) -> Self {
        self.custom.insert(name.into(), supported);
        self
    }
}
