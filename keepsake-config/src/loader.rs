//! Configuration loading and environment variable handling

use crate::domains::KeepsakeConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "KEEPSAKE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<KeepsakeConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: KeepsakeConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<KeepsakeConfig> {
        let mut config = KeepsakeConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<KeepsakeConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut KeepsakeConfig) -> ConfigResult<()> {
        self.apply_store_overrides(&mut config.store)?;
        self.apply_pattern_overrides(&mut config.pattern)?;
        self.apply_plugin_overrides(&mut config.plugins)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply store config overrides
    fn apply_store_overrides(
        &self,
        config: &mut crate::domains::store::StoreConfig,
    ) -> ConfigResult<()> {
        if let Ok(adapter) = self.get_env_var("STORE_ADAPTER") {
            config.adapter = adapter;
        }

        if let Some(capacity) = self.parse_env_var::<u64>("STORE_MAX_CAPACITY")? {
            config.max_capacity = Some(capacity);
        }

        if let Some(seconds) = self.parse_env_var::<u64>("STORE_TTL")? {
            config.ttl = Some(std::time::Duration::from_secs(seconds));
        }

        Ok(())
    }

    /// Apply pattern config overrides
    fn apply_pattern_overrides(
        &self,
        config: &mut crate::domains::pattern::PatternConfig,
    ) -> ConfigResult<()> {
        if let Some(cache_by_default) = self.parse_env_var("CACHE_BY_DEFAULT")? {
            config.cache_by_default = cache_by_default;
        }

        Ok(())
    }

    /// Apply plugin registry overrides
    fn apply_plugin_overrides(
        &self,
        config: &mut crate::domains::plugins::PluginsConfig,
    ) -> ConfigResult<()> {
        if let Some(shared) = self.parse_env_var("PLUGINS_SHARED_BY_DEFAULT")? {
            config.shared_by_default = shared;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Some(level) = self.parse_env_var("LOG_LEVEL")? {
            config.level = level;
        }

        if let Some(format) = self.parse_env_var("LOG_FORMAT")? {
            config.format = format;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }

    /// Parse a prefixed variable if it is set
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Ok(value) = self.get_env_var(name) else {
            return Ok(None);
        };
        value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidVariable {
                variable: format!("{}_{}", self.prefix, name),
                reason: e.to_string(),
                value,
            })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
