//! # URNs
//!
//! Metric URNs are colon-separated identifiers:
//!
//! ```text
//! frontend:metric:<id>[:<filter>...]                 plain metric
//! frontend:metric:current:<id>[:<filter>...]         value over the anomaly range
//! frontend:metric:baseline:<id>[:<filter>...]        value over the baseline range
//! ```
//!
//! Filter fragments are percent-encoded `dimension=value` pairs. Anything that
//! does not start with `frontend:metric:` is not a metric URN and is ignored by
//! the cache.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use crate::error::CacheError;

pub const METRIC_PREFIX: &str = "frontend:metric:";
pub const CURRENT_PREFIX: &str = "frontend:metric:current:";
pub const BASELINE_PREFIX: &str = "frontend:metric:baseline:";

/// Position of the metric id among the colon-separated segments of a
/// role-tagged URN.
const METRIC_ID_SEGMENT: usize = 3;

/// Role a metric URN plays in an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricRole {
    /// Plain metric reference; accepted as input, never fetched.
    Metric,
    /// Slice over the primary (anomaly) range.
    Current,
    /// Slice over the derived baseline range.
    Baseline,
}

impl MetricRole {
    /// Whether URNs with this role get their own fetch.
    pub fn is_fetchable(self) -> bool {
        matches!(self, MetricRole::Current | MetricRole::Baseline)
    }
}

impl std::fmt::Display for MetricRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricRole::Metric => write!(f, "metric"),
            MetricRole::Current => write!(f, "current"),
            MetricRole::Baseline => write!(f, "baseline"),
        }
    }
}

/// An opaque resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    pub fn new(raw: impl Into<String>) -> Self {
        Urn(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the URN by prefix. `None` for non-metric URNs.
    pub fn role(&self) -> Option<MetricRole> {
        if self.0.starts_with(CURRENT_PREFIX) {
            Some(MetricRole::Current)
        } else if self.0.starts_with(BASELINE_PREFIX) {
            Some(MetricRole::Baseline)
        } else if self.0.starts_with(METRIC_PREFIX) {
            Some(MetricRole::Metric)
        } else {
            None
        }
    }

    /// The metric id segment of a role-tagged URN.
    ///
    /// # Errors
    /// `CacheError::InvalidUrn` when the segment is missing or empty.
    pub fn metric_id(&self) -> Result<&str, CacheError> {
        match self.0.split(':').nth(METRIC_ID_SEGMENT) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(CacheError::InvalidUrn {
                urn: self.0.clone(),
                reason: "missing metric id segment".to_string(),
            }),
        }
    }

    /// Percent-decoded filter fragments following the metric id.
    ///
    /// # Errors
    /// `CacheError::InvalidUrn` when a fragment is not valid percent-encoded UTF-8.
    pub fn filter_fragments(&self) -> Result<Vec<String>, CacheError> {
        self.0
            .split(':')
            .skip(METRIC_ID_SEGMENT + 1)
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| {
                urlencoding::decode(fragment)
                    .map(|decoded| decoded.into_owned())
                    .map_err(|e| CacheError::InvalidUrn {
                        urn: self.0.clone(),
                        reason: format!("undecodable filter fragment '{fragment}': {e}"),
                    })
            })
            .collect()
    }
}

impl std::fmt::Display for Urn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Urn {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Urn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Urn {
    fn from(raw: &str) -> Self {
        Urn(raw.to_string())
    }
}

impl From<String> for Urn {
    fn from(raw: String) -> Self {
        Urn(raw)
    }
}
