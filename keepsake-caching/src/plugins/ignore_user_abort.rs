//! Keeps writes running when the caller goes away

use keepsake_plugin::{Plugin, PluginMetadata, PluginResult};
use std::any::Any;
use std::sync::Arc;

use super::{plugin_metadata, PluginOptions, StoragePlugin, WriteShield};

/// Runs writes on a spawned task so dropping the caller's future cannot leave
/// a write half done.
///
/// With `exit_on_abort` (the default) only the backend write is detached;
/// follow-up hooks such as expiry sweeps stay with the caller. Without it the
/// whole write, hooks included, runs to completion.
///
/// Outside a Tokio runtime writes run in place.
pub struct IgnoreUserAbort {
    metadata: PluginMetadata,
    exit_on_abort: bool,
}

impl IgnoreUserAbort {
    pub const ID: &'static str = "ignore_user_abort";

    pub fn new(options: &PluginOptions) -> Self {
        Self {
            metadata: plugin_metadata(
                Self::ID,
                "IgnoreUserAbort",
                "Completes writes even when the caller is dropped",
            ),
            exit_on_abort: options.exit_on_abort,
        }
    }

    pub fn factory(options: &serde_json::Value) -> PluginResult<Arc<dyn StoragePlugin>> {
        let options = PluginOptions::from_value(Self::ID, options)?;
        Ok(Arc::new(Self::new(&options)))
    }
}

impl Plugin for IgnoreUserAbort {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait::async_trait]
impl StoragePlugin for IgnoreUserAbort {
    fn write_shield(&self) -> WriteShield {
        if self.exit_on_abort {
            WriteShield::WriteOnly
        } else {
            WriteShield::WriteAndHooks
        }
    }
}
