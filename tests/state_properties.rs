//! Property tests for CacheState: coalescing and context-change pruning.

use aggregates_cache::*;
use proptest::prelude::*;
use serde_json::json;
use std::collections::{HashMap, HashSet};

const URNS: [&str; 8] = [
    "frontend:metric:current:1",
    "frontend:metric:current:2",
    "frontend:metric:baseline:1",
    "frontend:metric:baseline:2",
    "frontend:metric:current:3:country%3Dus",
    "frontend:metric:1",
    "thirdeye:metric:1",
    "frontend:dimension:country:us",
];

fn ctx(start: i64) -> RequestContext {
    RequestContext::new(TimeRange::new(start, start + 100), CompareMode::WoW)
}

fn pick(indices: &[usize]) -> Vec<&'static str> {
    indices.iter().map(|i| URNS[*i]).collect()
}

fn urn_indices() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..URNS.len(), 0..URNS.len())
}

proptest! {
    /// Within one context, a URN is planned at most once as long as no fetch fails.
    #[test]
    fn no_duplicate_fetch_within_context(
        steps in prop::collection::vec((urn_indices(), prop::collection::vec(any::<bool>(), 8)), 1..12)
    ) {
        let mut state = CacheState::new();
        let context = ctx(100);
        let mut planned: HashSet<Urn> = HashSet::new();

        for (indices, complete_mask) in steps {
            let fetches = state.request(&context, pick(&indices));
            for (i, fetch) in fetches.iter().enumerate() {
                prop_assert!(planned.insert(fetch.urn.clone()), "fetched twice: {}", fetch.urn);
                prop_assert!(fetch.role.is_fetchable());
                if complete_mask.get(i).copied().unwrap_or(false) {
                    let incoming = HashMap::from([(fetch.urn.clone(), json!(i))]);
                    prop_assert!(state.complete(fetch.generation, incoming));
                }
            }
        }
    }

    /// After a context change the cache holds exactly the previously cached
    /// URNs that are requested again.
    #[test]
    fn context_change_prunes_to_intersection(first in urn_indices(), second in urn_indices()) {
        let mut state = CacheState::new();
        for fetch in state.request(&ctx(100), pick(&first)) {
            state.complete(fetch.generation, HashMap::from([(fetch.urn.clone(), json!(1))]));
        }
        let cached_before: HashSet<Urn> = state.aggregates().into_keys().collect();

        state.request(&ctx(500), pick(&second));

        let requested: HashSet<Urn> = pick(&second).into_iter().map(Urn::from).collect();
        let expected: HashSet<Urn> = cached_before.intersection(&requested).cloned().collect();
        let actual: HashSet<Urn> = state.aggregates().into_keys().collect();
        prop_assert_eq!(actual, expected);
    }

    /// Completions captured before a context change never alter state.
    #[test]
    fn stale_completion_is_inert(first in urn_indices(), second in urn_indices()) {
        let mut state = CacheState::new();
        let stale = state.request(&ctx(100), pick(&first));
        state.request(&ctx(500), pick(&second));
        let before = state.snapshot();

        for fetch in stale {
            prop_assert!(!state.complete(fetch.generation, HashMap::from([(fetch.urn, json!(0))])));
        }
        prop_assert_eq!(state.snapshot(), before);
    }

    /// Pending holds only metric URNs; a requested plain metric URN stays
    /// pending without ever being planned.
    #[test]
    fn plain_metric_urns_pend_without_fetching(
        steps in prop::collection::vec((0i64..3, urn_indices()), 1..8)
    ) {
        let mut state = CacheState::new();
        for (c, indices) in steps {
            let requested = pick(&indices);
            let fetches = state.request(&ctx(c * 1_000), requested.clone());
            prop_assert!(fetches.iter().all(|f| f.role != MetricRole::Metric));
            let pending = state.pending();
            for urn in &pending {
                prop_assert!(urn.role().is_some(), "{}", urn);
            }
            for raw in requested {
                if Urn::from(raw).role() == Some(MetricRole::Metric) {
                    prop_assert!(pending.contains(raw), "{} not pending", raw);
                }
            }
        }
    }
}
