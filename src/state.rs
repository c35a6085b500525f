//! # Stage: CacheState
//!
//! ## Responsibility
//! The synchronous coalescing state machine. Holds the current analysis
//! context, the cached aggregates, the set of URNs with a fetch in flight and
//! the set of URNs whose latest fetch failed. Computes which URNs must be
//! fetched for a request and decides whether a completed fetch may commit.
//!
//! ## Guarantees
//! - A URN is never planned for fetching while it is pending under the same context
//! - A completion tagged with a superseded generation mutates nothing
//! - A context change keeps only cached entries whose URN is still requested
//! - Every reader returns an owned copy; no live references escape
//! - Non-panicking: no `unwrap` or `expect` in any production path
//!
//! ## NOT Responsible For
//! - Performing network I/O (see [`crate::cache::AggregatesCache`])
//! - Locking (callers wrap it in a `Mutex`)
//! - Eviction beyond context-change pruning

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::context::{RequestContext, TimeRange};
use crate::error::CacheError;
use crate::urn::{MetricRole, Urn};

/// Opaque aggregate payload for one URN over one range.
pub type AggregateValue = serde_json::Value;

/// Monotonic token identifying the context a fetch was issued under.
pub type Generation = u64;

/// A fetch planned by [`CacheState::request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceFetch {
    pub urn: Urn,
    pub role: MetricRole,
    pub range: TimeRange,
    /// Generation current when the fetch was planned.
    pub generation: Generation,
}

/// Point-in-time copy of every piece of observable state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheSnapshot {
    pub context: Option<RequestContext>,
    pub aggregates: HashMap<Urn, AggregateValue>,
    pub pending: HashSet<Urn>,
    pub errors: HashSet<Urn>,
}

#[derive(Debug, Default)]
pub struct CacheState {
    context: Option<RequestContext>,
    generation: Generation,
    aggregates: HashMap<Urn, AggregateValue>,
    pending: HashSet<Urn>,
    errors: HashSet<Urn>,
}

impl CacheState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the desired URN set against the current state and return the
    /// fetches that must be issued.
    ///
    /// Non-metric URNs are ignored. Plain `frontend:metric:` URNs are marked
    /// pending like any other missing URN but are never planned for fetching.
    ///
    /// On a context change the generation advances, the cache keeps only
    /// entries still requested (stale values shown while fresh ones load), and
    /// the pending set is replaced by every fetchable requested URN. Under an
    /// unchanged context only URNs neither cached nor pending are planned.
    ///
    /// The stored context is always replaced, even when nothing is planned.
    pub fn request<I>(&mut self, context: &RequestContext, urns: I) -> Vec<SliceFetch>
    where
        I: IntoIterator,
        I::Item: Into<Urn>,
    {
        let mut seen = HashSet::new();
        let metrics: Vec<(Urn, MetricRole)> = urns
            .into_iter()
            .map(Into::into)
            .filter_map(|urn| urn.role().map(|role| (urn, role)))
            .filter(|(urn, _)| seen.insert(urn.clone()))
            .collect();

        let context_changed = self.context.as_ref() != Some(context);

        let missing: Vec<(Urn, MetricRole)> = if context_changed {
            self.generation = self.generation.wrapping_add(1);

            let requested: HashSet<&Urn> = metrics.iter().map(|(urn, _)| urn).collect();
            self.aggregates.retain(|urn, _| requested.contains(urn));

            self.pending = metrics.iter().map(|(urn, _)| urn.clone()).collect();
            metrics
        } else {
            let missing: Vec<_> = metrics
                .into_iter()
                .filter(|(urn, _)| !self.aggregates.contains_key(urn) && !self.pending.contains(urn))
                .collect();
            self.pending.extend(missing.iter().map(|(urn, _)| urn.clone()));
            missing
        };

        self.context = Some(context.clone());

        debug!(
            context_changed,
            generation = self.generation,
            missing = missing.len(),
            pending = self.pending.len(),
            cached = self.aggregates.len(),
            "computed request delta"
        );

        if missing.is_empty() {
            return Vec::new();
        }

        let baseline_range = context.baseline_range();
        let (current, baseline): (Vec<_>, Vec<_>) = missing
            .into_iter()
            .filter(|(_, role)| role.is_fetchable())
            .partition(|(_, role)| *role == MetricRole::Current);

        current
            .into_iter()
            .map(|(urn, role)| (urn, role, context.anomaly_range))
            .chain(baseline.into_iter().map(|(urn, role)| (urn, role, baseline_range)))
            .map(|(urn, role, range)| SliceFetch {
                urn,
                role,
                range,
                generation: self.generation,
            })
            .collect()
    }

    /// Commit a fetched `{urn: value}` mapping if `generation` is still current.
    ///
    /// Incoming values overwrite cached ones and their URNs leave the pending
    /// set. Returns `false`, with no mutation, for a stale generation.
    pub fn complete(
        &mut self,
        generation: Generation,
        incoming: HashMap<Urn, AggregateValue>,
    ) -> bool {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                urns = incoming.len(),
                "received stale result, ignoring"
            );
            return false;
        }

        for (urn, value) in incoming {
            self.pending.remove(&urn);
            self.aggregates.insert(urn, value);
        }
        true
    }

    /// Record a failed fetch: `urn` joins the error set and leaves pending.
    ///
    /// Applies regardless of generation.
    pub fn handle_error(&mut self, urn: &Urn, error: &CacheError) {
        debug!(%urn, %error, "recording fetch error");
        self.pending.remove(urn);
        self.errors.insert(urn.clone());
    }

    /// Empty the error set. Nothing else changes.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn context(&self) -> Option<RequestContext> {
        self.context.clone()
    }

    pub fn aggregates(&self) -> HashMap<Urn, AggregateValue> {
        self.aggregates.clone()
    }

    pub fn pending(&self) -> HashSet<Urn> {
        self.pending.clone()
    }

    pub fn errors(&self) -> HashSet<Urn> {
        self.errors.clone()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            context: self.context(),
            aggregates: self.aggregates(),
            pending: self.pending(),
            errors: self.errors(),
        }
    }
}
