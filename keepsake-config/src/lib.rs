//! Domain-driven configuration management for Keepsake
//!
//! Configuration is split by functional domain (store, pattern, plugins,
//! logging), with validation, defaults, and environment variable support.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    logging::LoggingConfig, pattern::PatternConfig, plugins::PluginsConfig,
    store::{StoreConfig, StorePluginConfig},
    KeepsakeConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration_option;
