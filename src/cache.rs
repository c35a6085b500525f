//! # Stage: AggregatesCache
//!
//! ## Responsibility
//! Drive [`CacheState`] against a [`SliceFetcher`]. `request` computes the
//! delta synchronously, then spawns one tokio task per missing slice. Each
//! task fetches, extracts the value and re-enters the state to commit it
//! under the generation captured when the fetch was planned.
//!
//! ## Guarantees
//! - State mutations are serialized by one mutex that is never held across an `.await`
//! - Per-URN failures are recorded in the error set, never returned from `request`
//! - `request` never panics for lack of a runtime; unspawnable fetches become errors
//! - Superseded fetches run to completion; their results are dropped at commit time
//!
//! ## NOT Responsible For
//! - Cancelling in-flight transport requests
//! - Retrying failed slices
//! - Timing out pending URNs (the transport's timeout is the only bound)

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::context::RequestContext;
use crate::error::CacheError;
use crate::fetch::{extract_aggregates, SliceFetcher, SliceQuery};
use crate::state::{AggregateValue, CacheSnapshot, CacheState, SliceFetch};
use crate::urn::Urn;

/// Shared handle to the state machine.
pub type SharedState = Arc<Mutex<CacheState>>;

/// Context-scoped aggregate cache that coalesces slice fetches.
pub struct AggregatesCache<F: SliceFetcher> {
    state: SharedState,
    fetcher: Arc<F>,
}

impl<F: SliceFetcher> Clone for AggregatesCache<F> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<F: SliceFetcher> AggregatesCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_shared(Arc::new(fetcher))
    }

    /// Build a cache around an already shared fetcher.
    pub fn with_shared(fetcher: Arc<F>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new())),
            fetcher,
        }
    }

    /// Request values for `urns` under `context`.
    ///
    /// Returns immediately with one handle per spawned fetch; awaiting them
    /// is optional. An empty vector means nothing needed fetching.
    ///
    /// Outside a tokio runtime nothing can be spawned: the state is still
    /// updated and every planned URN is recorded in the error set.
    pub fn request<I>(&self, context: &RequestContext, urns: I) -> Vec<JoinHandle<()>>
    where
        I: IntoIterator,
        I::Item: Into<Urn>,
    {
        let runtime = Handle::try_current();

        let fetches = match self.state.lock() {
            Ok(mut state) => {
                let fetches = state.request(context, urns);
                if let Err(e) = &runtime {
                    let err = CacheError::Runtime(e.to_string());
                    for fetch in &fetches {
                        warn!(urn = %fetch.urn, error = %err, "cannot spawn slice fetch");
                        state.handle_error(&fetch.urn, &err);
                    }
                }
                fetches
            }
            Err(_) => {
                error!("cache state lock poisoned, dropping request");
                return Vec::new();
            }
        };

        let Ok(runtime) = runtime else {
            return Vec::new();
        };

        fetches
            .into_iter()
            .map(|fetch| {
                let state = Arc::clone(&self.state);
                let fetcher = Arc::clone(&self.fetcher);
                runtime.spawn(run_fetch(state, fetcher, fetch))
            })
            .collect()
    }

    /// Empty the error set.
    pub fn clear_errors(&self) {
        self.with_state(CacheState::clear_errors);
    }

    pub fn context(&self) -> Option<RequestContext> {
        self.read(CacheState::context).flatten()
    }

    pub fn aggregates(&self) -> HashMap<Urn, AggregateValue> {
        self.read(CacheState::aggregates).unwrap_or_default()
    }

    pub fn pending(&self) -> HashSet<Urn> {
        self.read(CacheState::pending).unwrap_or_default()
    }

    pub fn errors(&self) -> HashSet<Urn> {
        self.read(CacheState::errors).unwrap_or_default()
    }

    /// All four pieces of state, read under one lock.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.read(CacheState::snapshot).unwrap_or_default()
    }

    fn read<T>(&self, f: impl FnOnce(&CacheState) -> T) -> Option<T> {
        match self.state.lock() {
            Ok(state) => Some(f(&state)),
            Err(_) => {
                error!("cache state lock poisoned");
                None
            }
        }
    }

    fn with_state(&self, f: impl FnOnce(&mut CacheState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        } else {
            error!("cache state lock poisoned");
        }
    }
}

/// Fetch one slice and feed the outcome back into the state.
async fn run_fetch<F: SliceFetcher>(state: SharedState, fetcher: Arc<F>, fetch: SliceFetch) {
    let outcome = match SliceQuery::from_urn(&fetch.urn, fetch.range) {
        Ok(query) => fetcher
            .fetch_slice(&query)
            .await
            .and_then(|body| extract_aggregates(&body, &fetch.urn)),
        Err(e) => Err(e),
    };

    let Ok(mut state) = state.lock() else {
        error!(urn = %fetch.urn, "cache state lock poisoned, dropping fetch result");
        return;
    };

    match outcome {
        Ok(incoming) => {
            if state.complete(fetch.generation, incoming) {
                debug!(urn = %fetch.urn, role = %fetch.role, "slice committed");
            }
        }
        Err(e) => {
            warn!(urn = %fetch.urn, range = %fetch.range, error = %e, "slice fetch failed");
            state.handle_error(&fetch.urn, &e);
        }
    }
}

/// Convenience for callers that want to block on every spawned fetch.
///
/// Join errors (a panicked or aborted task) are logged and skipped.
pub async fn settle(handles: Vec<JoinHandle<()>>) {
    for result in futures_util::future::join_all(handles).await {
        if let Err(e) = result {
            warn!(error = %e, "slice fetch task did not finish");
        }
    }
}
