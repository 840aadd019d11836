//! Plugin registry for Keepsake
//!
//! Plugins are resolved by name. Every registry keeps an explicit alias table
//! (so `optimize_by_factor`, `optimizeByFactor` and `OptimizeByFactor` can all
//! name the same implementation), a factory per canonical name, and an
//! optional cache of shared instances. Each resolved instance is checked
//! against the capabilities the registry requires.

pub mod core;
pub mod error;
pub mod registry;
pub mod types;

// Re-export main types
pub use core::{Plugin, PluginMetadata};
pub use error::{PluginError, PluginResult};
pub use registry::{PluginFactory, PluginRegistry, RegistryStats};
pub use types::{PluginCapabilities, PluginType, PluginVersion, CONFIGURABLE};
