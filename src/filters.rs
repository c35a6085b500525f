//! URN filter fragments to the filter object sent to the aggregation endpoint.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CacheError;
use crate::urn::Urn;

/// Dimension name to the set of accepted values.
pub type FilterMap = BTreeMap<String, BTreeSet<String>>;

/// Extract `(dimension, value)` pairs from the URN's filter fragments.
///
/// Each fragment is split at its first `=`, so values may themselves contain `=`.
///
/// # Errors
/// `CacheError::InvalidUrn` for a fragment without `=` or with an empty dimension.
pub fn to_filters(urn: &Urn) -> Result<Vec<(String, String)>, CacheError> {
    urn.filter_fragments()?
        .into_iter()
        .map(|fragment| match fragment.split_once('=') {
            Some((dimension, value)) if !dimension.is_empty() => {
                Ok((dimension.to_string(), value.to_string()))
            }
            _ => Err(CacheError::InvalidUrn {
                urn: urn.to_string(),
                reason: format!("filter fragment '{fragment}' is not dimension=value"),
            }),
        })
        .collect()
}

/// Group filter pairs by dimension. Duplicate values collapse.
pub fn to_filter_map<I>(filters: I) -> FilterMap
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut map = FilterMap::new();
    for (dimension, value) in filters {
        map.entry(dimension).or_default().insert(value);
    }
    map
}

/// Serialize `filters` as JSON and percent-encode it for use in a query string.
///
/// # Errors
/// `CacheError::Json` if serialization fails.
pub fn encode_filter_map(filters: &FilterMap) -> Result<String, CacheError> {
    let json = serde_json::to_string(filters).map_err(|e| CacheError::Json {
        field: "filters".into(),
        detail: e.to_string(),
    })?;
    Ok(urlencoding::encode(&json).into_owned())
}
