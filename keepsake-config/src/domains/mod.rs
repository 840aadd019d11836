//! Domain-specific configuration modules

pub mod logging;
pub mod pattern;
pub mod plugins;
pub mod store;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Keepsake configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeepsakeConfig {
    /// Backing store configuration
    #[serde(default)]
    pub store: store::StoreConfig,

    /// Class cache pattern configuration
    #[serde(default)]
    pub pattern: pattern::PatternConfig,

    /// Plugin registry configuration
    #[serde(default)]
    pub plugins: plugins::PluginsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl KeepsakeConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.store.validate()?;
        self.pattern.validate()?;
        self.plugins.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = KeepsakeConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
