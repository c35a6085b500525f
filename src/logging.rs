//! Tracing subscriber bootstrap for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the process that embeds it.

use tracing_subscriber::EnvFilter;

use crate::error::CacheError;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used.
///
/// # Errors
/// `CacheError::Logging` when the filter is invalid or a global subscriber is
/// already installed.
pub fn init_logging(default_filter: &str) -> Result<(), CacheError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| CacheError::Logging(format!("invalid filter '{default_filter}': {e}")))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CacheError::Logging(e.to_string()))
}
