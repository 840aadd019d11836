//! Reports store failures and optionally hides them from callers

use keepsake_plugin::{Plugin, PluginMetadata, PluginResult};
use std::any::Any;
use std::sync::Arc;

use super::{plugin_metadata, ErrorDisposition, PluginOptions, StoragePlugin};
use crate::CacheError;

/// Callback invoked with every failure the handler sees
pub type ErrorCallback = Arc<dyn Fn(&CacheError) + Send + Sync>;

/// Passes each failure to an optional callback and, unless
/// `throw_exceptions` is set, suppresses it.
///
/// A suppressed read turns into a miss, a suppressed write into a no-op.
pub struct ExceptionHandler {
    metadata: PluginMetadata,
    throw_exceptions: bool,
    callback: Option<ErrorCallback>,
}

impl ExceptionHandler {
    pub const ID: &'static str = "exception_handler";

    pub fn new(options: &PluginOptions) -> Self {
        Self {
            metadata: plugin_metadata(
                Self::ID,
                "ExceptionHandler",
                "Reports store failures and optionally suppresses them",
            ),
            throw_exceptions: options.throw_exceptions,
            callback: None,
        }
    }

    /// Invoke `callback` with every failure
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CacheError) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn throw_exceptions(&self) -> bool {
        self.throw_exceptions
    }

    pub fn factory(options: &serde_json::Value) -> PluginResult<Arc<dyn StoragePlugin>> {
        let options = PluginOptions::from_value(Self::ID, options)?;
        Ok(Arc::new(Self::new(&options)))
    }
}

impl Plugin for ExceptionHandler {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait::async_trait]
impl StoragePlugin for ExceptionHandler {
    fn on_error(&self, error: &CacheError) -> ErrorDisposition {
        if let Some(callback) = &self.callback {
            callback(error);
        }

        if self.throw_exceptions {
            ErrorDisposition::Propagate
        } else {
            tracing::warn!(target: "pluggable_store", error = %error, "Suppressed store failure");
            ErrorDisposition::Suppress
        }
    }
}
