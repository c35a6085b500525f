//! Analysis context: the primary time range plus the comparison mode used to
//! derive the baseline range.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CacheError;

/// One week in milliseconds.
pub const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1_000;

/// A half-open `[start, end)` window in epoch milliseconds.
///
/// Serialized as a two-element array, rendered as `start:end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Shift both endpoints by `offset_ms` (negative moves back in time).
    pub fn shifted(self, offset_ms: i64) -> Self {
        Self {
            start: self.start.saturating_add(offset_ms),
            end: self.end.saturating_add(offset_ms),
        }
    }
}

impl From<(i64, i64)> for TimeRange {
    fn from((start, end): (i64, i64)) -> Self {
        Self { start, end }
    }
}

impl From<TimeRange> for (i64, i64) {
    fn from(range: TimeRange) -> Self {
        (range.start, range.end)
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// How the baseline window is derived from the anomaly window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CompareMode {
    /// Week over week.
    WoW,
    Wo2W,
    Wo3W,
    Wo4W,
}

impl CompareMode {
    /// Number of weeks the baseline lags the anomaly range.
    pub fn offset_weeks(self) -> i64 {
        match self {
            CompareMode::WoW => 1,
            CompareMode::Wo2W => 2,
            CompareMode::Wo3W => 3,
            CompareMode::Wo4W => 4,
        }
    }

    /// Derive the baseline range for `range`.
    pub fn baseline_range(self, range: TimeRange) -> TimeRange {
        range.shifted(-self.offset_weeks() * WEEK_MS)
    }
}

impl FromStr for CompareMode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wow" | "wo1w" => Ok(CompareMode::WoW),
            "wo2w" => Ok(CompareMode::Wo2W),
            "wo3w" => Ok(CompareMode::Wo3W),
            "wo4w" => Ok(CompareMode::Wo4W),
            _ => Err(CacheError::UnknownCompareMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for CompareMode {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CompareMode> for String {
    fn from(mode: CompareMode) -> Self {
        mode.to_string()
    }
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareMode::WoW => write!(f, "WoW"),
            CompareMode::Wo2W => write!(f, "Wo2W"),
            CompareMode::Wo3W => write!(f, "Wo3W"),
            CompareMode::Wo4W => write!(f, "Wo4W"),
        }
    }
}

/// The analysis parameters that scope which cached values are valid.
///
/// Two contexts are the same context iff they are structurally equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub anomaly_range: TimeRange,
    pub compare_mode: CompareMode,
}

impl RequestContext {
    pub fn new(anomaly_range: TimeRange, compare_mode: CompareMode) -> Self {
        Self { anomaly_range, compare_mode }
    }

    pub fn baseline_range(&self) -> TimeRange {
        self.compare_mode.baseline_range(self.anomaly_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("wow", CompareMode::WoW)]
    #[case("WoW", CompareMode::WoW)]
    #[case("wo1w", CompareMode::WoW)]
    #[case("Wo2W", CompareMode::Wo2W)]
    #[case("wo3w", CompareMode::Wo3W)]
    #[case("WO4W", CompareMode::Wo4W)]
    fn compare_mode_parses_case_insensitively(#[case] raw: &str, #[case] expected: CompareMode) {
        assert_eq!(raw.parse::<CompareMode>().unwrap(), expected);
    }

    #[test]
    fn compare_mode_unknown_is_error() {
        let err = "yoy".parse::<CompareMode>().unwrap_err();
        assert!(matches!(err, CacheError::UnknownCompareMode(ref s) if s == "yoy"));
    }

    #[rstest]
    #[case(CompareMode::WoW, 1)]
    #[case(CompareMode::Wo2W, 2)]
    #[case(CompareMode::Wo3W, 3)]
    #[case(CompareMode::Wo4W, 4)]
    fn baseline_range_shifts_by_weeks(#[case] mode: CompareMode, #[case] weeks: i64) {
        let range = TimeRange::new(10 * WEEK_MS, 10 * WEEK_MS + 3_600_000);
        let baseline = mode.baseline_range(range);
        assert_eq!(baseline.start, range.start - weeks * WEEK_MS);
        assert_eq!(baseline.end, range.end - weeks * WEEK_MS);
        assert_eq!(baseline.end - baseline.start, range.end - range.start);
    }

    #[test]
    fn time_range_display_is_start_colon_end() {
        assert_eq!(TimeRange::new(100, 200).to_string(), "100:200");
    }

    #[test]
    fn context_serde_uses_camel_case_and_pairs() {
        let ctx = RequestContext::new(TimeRange::new(100, 200), CompareMode::WoW);
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["anomalyRange"], serde_json::json!([100, 200]));
        assert_eq!(json["compareMode"], "WoW");

        let back: RequestContext =
            serde_json::from_str(r#"{"anomalyRange":[100,200],"compareMode":"wo1w"}"#).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn contexts_compare_structurally() {
        let a = RequestContext::new(TimeRange::new(100, 200), CompareMode::WoW);
        let b = RequestContext::new(TimeRange::new(100, 200), CompareMode::WoW);
        let c = RequestContext::new(TimeRange::new(100, 201), CompareMode::WoW);
        let d = RequestContext::new(TimeRange::new(100, 200), CompareMode::Wo2W);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
