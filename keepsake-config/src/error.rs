//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An override variable is set but its value does not parse
    #[error("Invalid value '{value}' for {variable}: {reason}")]
    InvalidVariable {
        variable: String,
        value: String,
        reason: String,
    },

    /// A domain rejected its settings during validation
    #[error("Invalid {domain} configuration: {message}")]
    Domain { domain: String, message: String },
}
