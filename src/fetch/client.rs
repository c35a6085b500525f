//! HTTP client for the aggregation endpoint.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::CacheConfig;
use crate::context::TimeRange;
use crate::error::CacheError;
use crate::filters::{encode_filter_map, to_filter_map, to_filters, FilterMap};
use crate::urn::Urn;

/// Default aggregation endpoint path, appended to the base URL.
pub const DEFAULT_ENDPOINT: &str = "/aggregation/aggregate";

/// Everything needed to fetch one slice: metric, range and filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceQuery {
    pub metric_id: String,
    pub range: TimeRange,
    pub filters: FilterMap,
}

impl SliceQuery {
    /// Build the query for `urn` over `range`.
    ///
    /// # Errors
    /// `CacheError::InvalidUrn` when the metric id or a filter fragment cannot
    /// be parsed.
    pub fn from_urn(urn: &Urn, range: TimeRange) -> Result<Self, CacheError> {
        Ok(Self {
            metric_id: urn.metric_id()?.to_string(),
            range,
            filters: to_filter_map(to_filters(urn)?),
        })
    }

    /// Render `<base_url><endpoint>?metricIds=..&ranges=start:end&filters=..`.
    ///
    /// # Errors
    /// `CacheError::InvalidUrl` when the result is not a valid URL.
    pub fn to_url(&self, base_url: &str, endpoint: &str) -> Result<reqwest::Url, CacheError> {
        let raw = format!(
            "{}{}?metricIds={}&ranges={}&filters={}",
            base_url.trim_end_matches('/'),
            endpoint,
            urlencoding::encode(&self.metric_id),
            self.range,
            encode_filter_map(&self.filters)?,
        );
        reqwest::Url::parse(&raw).map_err(|e| CacheError::InvalidUrl(format!("{raw}: {e}")))
    }
}

/// Transport seam for slice fetches.
///
/// Implementations return the parsed JSON body of a successful response and
/// map every transport or status failure to a [`CacheError`].
pub trait SliceFetcher: Send + Sync + 'static {
    fn fetch_slice(
        &self,
        query: &SliceQuery,
    ) -> impl Future<Output = Result<serde_json::Value, CacheError>> + Send;
}

/// reqwest-backed [`SliceFetcher`]. Use [`HttpSliceFetcherBuilder`] for construction.
#[derive(Debug, Clone)]
pub struct HttpSliceFetcher {
    base_url: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSliceFetcher {
    /// Start building a fetcher aimed at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> HttpSliceFetcherBuilder {
        HttpSliceFetcherBuilder::new(base_url)
    }

    /// Build a fetcher from loaded configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        HttpSliceFetcher::builder(config.base_url.clone())
            .endpoint(config.endpoint.clone())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .request_timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SliceFetcher for HttpSliceFetcher {
    /// GET the slice and return the parsed body.
    ///
    /// # Returns
    /// - `Ok(Value)` on a 2xx response with a JSON body.
    /// - `Err(CacheError::Connect)` when the connection or transfer fails.
    /// - `Err(CacheError::Http)` when the server replies with a non-2xx code.
    /// - `Err(CacheError::Json)` when the body is not JSON.
    async fn fetch_slice(&self, query: &SliceQuery) -> Result<serde_json::Value, CacheError> {
        let url = query.to_url(&self.base_url, &self.endpoint)?;
        debug!(%url, metric_id = %query.metric_id, range = %query.range, "fetching slice");

        let resp = self.client.get(url.clone()).send().await.map_err(|e| {
            CacheError::Connect {
                url: url.to_string(),
                detail: e.to_string(),
            }
        })?;

        if !resp.status().is_success() {
            return Err(CacheError::Http {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| CacheError::Connect {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| CacheError::Json {
            field: "body".into(),
            detail: e.to_string(),
        })
    }
}

/// Builder for [`HttpSliceFetcher`].
///
/// # Example
/// ```rust,ignore
/// let fetcher = HttpSliceFetcher::builder("http://localhost:1426")
///     .connect_timeout(Duration::from_secs(1))
///     .build();
/// ```
pub struct HttpSliceFetcherBuilder {
    base_url: String,
    endpoint: String,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl HttpSliceFetcherBuilder {
    /// Create a builder targeting `base_url` with 3 s connect and 10 s request timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Override the endpoint path (default `/aggregation/aggregate`).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Consume the builder and construct an [`HttpSliceFetcher`].
    ///
    /// # Panics
    /// This function never panics.
    pub fn build(self) -> HttpSliceFetcher {
        // reqwest::Client::builder() can fail in extreme environments;
        // fall back to a default client instead of panicking.
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .unwrap_or_default();

        HttpSliceFetcher {
            base_url: self.base_url,
            endpoint: self.endpoint,
            client,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
