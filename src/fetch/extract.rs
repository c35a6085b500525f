//! Converts aggregation endpoint responses into `{urn: value}` mappings.
//!
//! ## Responsibility
//! The endpoint answers with `{ <rangeKey>: { <metricId>: <value> } }`. Key
//! literals are assigned by the server, so both levels are walked without
//! looking keys up. Each fetch asks for one range and one metric; when a
//! response carries more, the last entry in key order wins.

use std::collections::HashMap;

use crate::error::CacheError;
use crate::state::AggregateValue;
use crate::urn::Urn;

/// Extract the single aggregate value in `body` and associate it with `urn`.
///
/// # Errors
/// `CacheError::MalformedResponse` when either level is not a JSON object or
/// no value is present.
///
/// # Panics
/// This function never panics.
pub fn extract_aggregates(
    body: &serde_json::Value,
    urn: &Urn,
) -> Result<HashMap<Urn, AggregateValue>, CacheError> {
    let malformed = |detail: &str| CacheError::MalformedResponse {
        urn: urn.to_string(),
        detail: detail.to_string(),
    };

    let ranges = body
        .as_object()
        .ok_or_else(|| malformed("response is not an object"))?;

    let mut found = None;
    for (range_key, metrics) in ranges {
        let metrics = metrics.as_object().ok_or_else(|| {
            malformed(&format!("range entry '{range_key}' is not an object"))
        })?;
        for value in metrics.values() {
            found = Some(value.clone());
        }
    }

    let value = found.ok_or_else(|| malformed("no metric entry in response"))?;
    Ok(HashMap::from([(urn.clone(), value)]))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urn() -> Urn {
        Urn::from("frontend:metric:current:5")
    }

    #[test]
    fn single_value_maps_to_urn() {
        let out = extract_aggregates(&json!({ "100:200": { "5": 42 } }), &urn()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[&urn()], json!(42));
    }

    #[test]
    fn key_literals_are_not_assumed() {
        let body = json!({ "whatever": { "metric-xyz": 3.5 } });
        let out = extract_aggregates(&body, &urn()).unwrap();
        assert_eq!(out[&urn()], json!(3.5));
    }

    #[test]
    fn structured_values_pass_through() {
        let body = json!({ "r": { "m": { "sum": 10, "count": 2 } } });
        let out = extract_aggregates(&body, &urn()).unwrap();
        assert_eq!(out[&urn()]["count"], 2);
    }

    #[test]
    fn multiple_entries_collapse_to_last_in_key_order() {
        let body = json!({
            "a": { "1": 1, "2": 2 },
            "b": { "3": 3 }
        });
        let out = extract_aggregates(&body, &urn()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[&urn()], json!(3));
    }

    #[test]
    fn null_value_is_still_a_value() {
        let out = extract_aggregates(&json!({ "r": { "m": null } }), &urn()).unwrap();
        assert!(out[&urn()].is_null());
    }

    #[test]
    fn empty_object_is_malformed() {
        let err = extract_aggregates(&json!({}), &urn()).unwrap_err();
        assert!(matches!(err, CacheError::MalformedResponse { .. }));
    }

    #[test]
    fn empty_inner_object_is_malformed() {
        assert!(extract_aggregates(&json!({ "r": {} }), &urn()).is_err());
    }

    #[test]
    fn non_object_top_level_is_malformed() {
        assert!(extract_aggregates(&json!([1, 2]), &urn()).is_err());
        assert!(extract_aggregates(&json!(42), &urn()).is_err());
    }

    #[test]
    fn non_object_range_entry_is_malformed() {
        let err = extract_aggregates(&json!({ "r": 42 }), &urn()).unwrap_err();
        assert!(err.to_string().contains("'r'"), "{err}");
    }
}
