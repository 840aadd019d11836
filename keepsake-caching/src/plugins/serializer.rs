//! Stores values as JSON text

use keepsake_plugin::{Plugin, PluginMetadata, PluginResult};
use std::any::Any;
use std::sync::Arc;

use super::{plugin_metadata, PluginOptions, StoragePlugin};
use crate::store::CallValue;
use crate::{CacheError, CacheResult};

/// Encodes values to JSON text before they are stored and decodes them on read
pub struct Serializer {
    metadata: PluginMetadata,
}

impl Serializer {
    pub const ID: &'static str = "serializer";

    pub fn new() -> Self {
        Self {
            metadata: plugin_metadata(Self::ID, "Serializer", "Stores values as JSON text"),
        }
    }

    pub fn factory(options: &serde_json::Value) -> PluginResult<Arc<dyn StoragePlugin>> {
        PluginOptions::from_value(Self::ID, options)?;
        Ok(Arc::new(Self::new()))
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for Serializer {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait::async_trait]
impl StoragePlugin for Serializer {
    fn pre_set(&self, _key: &str, value: &mut CallValue) -> CacheResult<()> {
        *value = CallValue::String(serde_json::to_string(value)?);
        Ok(())
    }

    fn post_get(&self, key: &str, value: &mut CallValue) -> CacheResult<()> {
        let CallValue::String(text) = value else {
            return Err(CacheError::DeserializationError(format!(
                "entry {key} was not stored as text"
            )));
        };
        let decoded: CallValue = serde_json::from_str(text)?;
        *value = decoded;
        Ok(())
    }
}
