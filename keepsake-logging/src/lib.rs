//! Logging setup for Keepsake
//!
//! Library crates only emit `tracing` events. Binaries and tests call one of
//! the initialisers here to install a subscriber built from `LoggingConfig`.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
pub use keepsake_config::domains::logging::{LogFormat, LogLevel, LoggingConfig};
