//! Store and pattern error types

use keepsake_plugin::PluginError;
use thiserror::Error;

/// Result type for store operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Result type for the class cache pattern
pub type PatternResult<T> = std::result::Result<T, PatternError>;

/// Store-related errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache capacity exceeded
    #[error("Cache capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Invalid configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfiguration(String),

    /// Backend-specific error
    #[error("Cache backend error: {0}")]
    BackendError(String),

    /// A spawned write did not complete
    #[error("Background write failed: {0}")]
    BackgroundWrite(String),

    /// Adapter or storage plugin could not be resolved
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl CacheError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::BackendError(message.into())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            CacheError::DeserializationError(err.to_string())
        } else {
            CacheError::SerializationError(err.to_string())
        }
    }
}

/// Errors surfaced by [`ClassCache`](crate::pattern::ClassCache)
#[derive(Debug, Error)]
pub enum PatternError {
    /// The cache was built without a required part
    #[error("Invalid class cache configuration: {0}")]
    Configuration(String),

    /// The backing store failed; never reported as a miss
    #[error("Cache store failure: {0}")]
    Store(#[from] CacheError),

    /// The wrapped target failed; the original error is kept intact
    #[error(transparent)]
    Invocation(anyhow::Error),
}

impl PatternError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the target, rather than the cache, failed
    pub fn is_invocation_error(&self) -> bool {
        matches!(self, Self::Invocation(_))
    }

    /// The target's own error, if that is what failed
    pub fn invocation_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Invocation(err) => Some(err),
            _ => None,
        }
    }
}
