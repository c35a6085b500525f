//! # Fetch
//!
//! Outbound side of the cache: one HTTP GET per missing slice against the
//! aggregation endpoint.
//!
//! ## What It Does
//!
//! 1. **Query building**: [`SliceQuery`] turns a URN and a range into the
//!    `metricIds` / `ranges` / `filters` query parameters.
//! 2. **Transport**: [`SliceFetcher`] is the seam the cache fetches through;
//!    [`HttpSliceFetcher`] is the reqwest-backed implementation.
//! 3. **Extraction**: [`extract_aggregates`] reduces the nested response to a
//!    single `{urn: value}` entry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let fetcher = HttpSliceFetcher::builder("http://localhost:1426")
//!     .request_timeout(Duration::from_secs(5))
//!     .build();
//! let query = SliceQuery::from_urn(&urn, TimeRange::new(100, 200))?;
//! let body = fetcher.fetch_slice(&query).await?;
//! ```

pub mod client;
pub mod extract;

pub use client::{HttpSliceFetcher, HttpSliceFetcherBuilder, SliceFetcher, SliceQuery};
pub use extract::extract_aggregates;
