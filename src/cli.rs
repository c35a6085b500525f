//! Command-line arguments for the one-shot `aggregates-cache` driver.

use clap::Parser;
use std::path::PathBuf;

use crate::config::CacheConfig;
use crate::context::{CompareMode, RequestContext, TimeRange};
use crate::error::CacheError;

#[derive(Parser, Debug)]
#[command(name = "aggregates-cache")]
#[command(version)]
#[command(about = "Fetch metric and baseline aggregates for an analysis window")]
pub struct Args {
    /// Metric URNs to request (e.g. frontend:metric:current:5)
    #[arg(required = true)]
    pub urns: Vec<String>,

    /// Anomaly range start, epoch milliseconds (inclusive)
    #[arg(long)]
    pub start: i64,

    /// Anomaly range end, epoch milliseconds (exclusive)
    #[arg(long)]
    pub end: i64,

    /// Baseline offset: wow/wo1w, wo2w, wo3w, wo4w
    #[arg(long, default_value = "wo1w")]
    pub compare_mode: String,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Aggregation service base URL (overrides config and environment)
    #[arg(long)]
    pub base_url: Option<String>,
}

impl Args {
    /// Assemble the request context from the range and compare-mode flags.
    pub fn context(&self) -> Result<RequestContext, CacheError> {
        if self.end < self.start {
            return Err(CacheError::Config(format!(
                "range end {} precedes start {}",
                self.end, self.start
            )));
        }
        let mode: CompareMode = self.compare_mode.parse()?;
        Ok(RequestContext::new(TimeRange::new(self.start, self.end), mode))
    }

    /// Layer config file, environment and `--base-url`, in that order.
    pub fn load_config(&self) -> Result<CacheConfig, CacheError> {
        let config = match &self.config {
            Some(path) => CacheConfig::load(path)?,
            None => CacheConfig::default(),
        };
        let mut config = config.with_env_overrides();
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
            config.validate()?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_minimal() {
        let args = Args::parse_from([
            "ac",
            "--start",
            "100",
            "--end",
            "200",
            "frontend:metric:current:5",
        ]);
        assert_eq!(args.urns, vec!["frontend:metric:current:5".to_string()]);
        assert_eq!(args.start, 100);
        assert_eq!(args.end, 200);
        assert_eq!(args.compare_mode, "wo1w");
        assert!(args.config.is_none());
        assert!(args.base_url.is_none());
    }

    #[test]
    fn test_args_parse_full() {
        let args = Args::parse_from([
            "ac",
            "--start",
            "0",
            "--end",
            "10",
            "--compare-mode",
            "wo2w",
            "--config",
            "cache.toml",
            "--base-url",
            "http://te:1426",
            "frontend:metric:current:5",
            "frontend:metric:baseline:5",
        ]);
        assert_eq!(args.urns.len(), 2);
        assert_eq!(args.config, Some(PathBuf::from("cache.toml")));
        assert_eq!(args.base_url.as_deref(), Some("http://te:1426"));
        assert_eq!(args.context().unwrap().compare_mode, CompareMode::Wo2W);
    }

    #[test]
    fn test_args_require_urn() {
        assert!(Args::try_parse_from(["ac", "--start", "0", "--end", "1"]).is_err());
    }

    #[test]
    fn test_context_from_args() {
        let args = Args::parse_from(["ac", "--start", "100", "--end", "200", "u"]);
        let ctx = args.context().unwrap();
        assert_eq!(ctx.anomaly_range, TimeRange::new(100, 200));
        assert_eq!(ctx.compare_mode, CompareMode::WoW);
    }

    #[test]
    fn test_context_rejects_inverted_range() {
        let args = Args::parse_from(["ac", "--start", "200", "--end", "100", "u"]);
        assert!(matches!(args.context(), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_context_rejects_unknown_mode() {
        let args = Args::parse_from(["ac", "--start", "1", "--end", "2", "--compare-mode", "yoy", "u"]);
        assert!(matches!(args.context(), Err(CacheError::UnknownCompareMode(_))));
    }

    #[test]
    fn test_base_url_flag_wins() {
        let args = Args::parse_from([
            "ac",
            "--start",
            "1",
            "--end",
            "2",
            "--base-url",
            "http://flag:1",
            "u",
        ]);
        assert_eq!(args.load_config().unwrap().base_url, "http://flag:1");
    }

    #[test]
    fn test_blank_base_url_flag_rejected() {
        let args = Args::parse_from(["ac", "--start", "1", "--end", "2", "--base-url", "  ", "u"]);
        assert!(matches!(args.load_config(), Err(CacheError::Config(_))));
    }
}
