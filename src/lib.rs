//! # aggregates-cache
//!
//! Client-side cache and request coalescer for time-series aggregate slices.
//!
//! Values are keyed by metric URN and scoped to one analysis context (an
//! anomaly range plus a compare mode). [`AggregatesCache::request`] returns
//! immediately: cached values stay visible, URNs already in flight are not
//! fetched again, and results that arrive after the context has moved on are
//! discarded. Failed URNs collect in an error set until
//! [`AggregatesCache::clear_errors`] is called.
//!
//! ```rust,ignore
//! let cache = AggregatesCache::new(HttpSliceFetcher::from_config(&config));
//! let context = RequestContext::new(TimeRange::new(100, 200), CompareMode::WoW);
//! settle(cache.request(&context, ["frontend:metric:current:5"])).await;
//! println!("{:?}", cache.aggregates());
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod logging;
pub mod state;
pub mod urn;

pub use cache::{settle, AggregatesCache};
pub use config::CacheConfig;
pub use context::{CompareMode, RequestContext, TimeRange};
pub use error::CacheError;
pub use fetch::{HttpSliceFetcher, SliceFetcher, SliceQuery};
pub use state::{AggregateValue, CacheSnapshot, CacheState, Generation, SliceFetch};
pub use urn::{MetricRole, Urn};
