//! Core plugin trait and metadata

use serde::{Deserialize, Serialize};
use std::any::Any;

use crate::types::{PluginCapabilities, PluginType, PluginVersion};

/// Plugin metadata containing information about the plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Canonical identifier, the name the registry binds the factory to
    pub id: String,
    /// Plugin display name
    pub name: String,
    /// Plugin version
    pub version: PluginVersion,
    /// Plugin description
    pub description: String,
    /// Plugin type
    pub plugin_type: PluginType,
    /// Plugin capabilities
    #[serde(default)]
    pub capabilities: PluginCapabilities,
}

impl PluginMetadata {
    /// Create a new plugin metadata
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: PluginVersion,
        description: impl Into<String>,
        plugin_type: PluginType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version,
            description: description.into(),
            plugin_type,
            capabilities: PluginCapabilities::default(),
        }
    }

    /// Set plugin capabilities
    pub fn with_capabilities(mut self, capabilities: PluginCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Core plugin trait that all plugins must implement
pub trait Plugin: Send + Sync {
    /// Get plugin metadata
    fn metadata(&self) -> &PluginMetadata;

    /// Capabilities checked by the registry on resolution
    fn capabilities(&self) -> &PluginCapabilities {
        &self.metadata().capabilities
    }

    /// Convert to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}
