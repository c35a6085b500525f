//! Crate-level error type.
//!
//! Fetch-path variants (`Http`, `Connect`, `Json`, `MalformedResponse`,
//! `InvalidUrn`, `Runtime`) never reach the caller of
//! [`AggregatesCache::request`](crate::cache::AggregatesCache::request); they
//! are routed into the error set for the offending URN. The remaining variants
//! surface from configuration, parsing and bootstrap APIs.

use thiserror::Error;

/// Errors produced by the aggregates cache and its collaborators.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The aggregation endpoint replied with a non-2xx HTTP status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// A TCP-level connection could not be established or the transfer failed.
    #[error("Connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// Response body could not be parsed as JSON.
    #[error("JSON parse error on field '{field}': {detail}")]
    Json { field: String, detail: String },

    /// The body parsed but did not have the `{range: {metric: value}}` shape.
    #[error("Malformed aggregate response for {urn}: {detail}")]
    MalformedResponse { urn: String, detail: String },

    /// The URN lacks a metric id or carries an unparseable filter fragment.
    #[error("Invalid URN '{urn}': {reason}")]
    InvalidUrn { urn: String, reason: String },

    /// A fetch could not be spawned because no tokio runtime is running.
    #[error("No async runtime available: {0}")]
    Runtime(String),

    #[error("Unknown compare mode: {0}")]
    UnknownCompareMode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging initialisation failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for CacheError {
    fn from(err: toml::de::Error) -> Self {
        CacheError::Config(err.to_string())
    }
}
