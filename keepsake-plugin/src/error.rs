//! Plugin system error types

use thiserror::Error;

/// Plugin system result type
pub type PluginResult<T> = Result<T, PluginError>;

/// Plugin system errors
#[derive(Error, Debug)]
pub enum PluginError {
    /// No alias or factory matches the requested name
    #[error("Plugin '{name}' not found")]
    PluginNotFound {
        name: String,
    },

    /// A resolved instance lacks a capability the registry requires
    #[error("Plugin '{name}' does not provide required capability '{capability}'")]
    MissingCapability {
        name: String,
        capability: String,
    },

    /// Plugin factory failed
    #[error("Plugin '{name}' initialization failed: {reason}")]
    InitializationFailed {
        name: String,
        reason: String,
    },

    /// Options handed to a factory could not be decoded
    #[error("Invalid options for plugin '{name}': {source}")]
    InvalidOptions {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Alias chain loops back on itself
    #[error("Alias '{alias}' resolves to itself")]
    AliasCycle {
        alias: String,
    },
}

impl PluginError {
    /// Create a new initialization failed error
    pub fn initialization_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InitializationFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid options error
    pub fn invalid_options(name: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidOptions {
            name: name.into(),
            source,
        }
    }

    /// The requested name could not be mapped to any implementation
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::PluginNotFound { .. })
    }

    /// The registry or a resolved instance is misconfigured
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCapability { .. }
                | Self::InvalidOptions { .. }
                | Self::AliasCycle { .. }
        )
    }
}
