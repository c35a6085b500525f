//! Runtime configuration, loaded from TOML with environment overrides.
//!
//! ```toml
//! base_url = "http://localhost:1426"
//! endpoint = "/aggregation/aggregate"
//! connect_timeout_ms = 3000
//! request_timeout_ms = 10000
//! log_filter = "aggregates_cache=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::CacheError;
use crate::fetch::client::DEFAULT_ENDPOINT;

/// Overrides `base_url`.
pub const ENV_BASE_URL: &str = "AGGREGATES_BASE_URL";
/// Overrides `log_filter`.
pub const ENV_LOG: &str = "AGGREGATES_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Scheme, host and port of the aggregation service.
    pub base_url: String,
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    /// Applies to the transport only. The cache never times out a pending URN.
    pub request_timeout_ms: u64,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1426".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_ms: 3_000,
            request_timeout_ms: 10_000,
            log_filter: "info".to_string(),
        }
    }
}

impl CacheConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    /// `CacheError::Config` on invalid TOML, unknown keys or a zero timeout.
    pub fn from_toml_str(raw: &str) -> Result<Self, CacheError> {
        let config: CacheConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the TOML file at `path`.
    ///
    /// # Errors
    /// `CacheError::Io` when the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Apply `AGGREGATES_BASE_URL` and `AGGREGATES_LOG` when set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(env::var(ENV_BASE_URL).ok(), env::var(ENV_LOG).ok())
    }

    fn with_overrides(mut self, base_url: Option<String>, log_filter: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|s| !s.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(filter) = log_filter.filter(|s| !s.trim().is_empty()) {
            self.log_filter = filter;
        }
        self
    }

    pub(crate) fn validate(&self) -> Result<(), CacheError> {
        if self.base_url.trim().is_empty() {
            return Err(CacheError::Config("base_url must not be empty".to_string()));
        }
        if !self.endpoint.starts_with('/') {
            return Err(CacheError::Config(format!(
                "endpoint '{}' must start with '/'",
                self.endpoint
            )));
        }
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(CacheError::Config("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }
}
