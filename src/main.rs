//! `aggregates-cache`: request one set of URNs, wait for every fetch and
//! print the resulting snapshot as JSON.

use aggregates_cache::cli::Args;
use aggregates_cache::logging::init_logging;
use aggregates_cache::{settle, AggregatesCache, HttpSliceFetcher};
use clap::Parser;
use colored::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = args.load_config()?;
    init_logging(&config.log_filter)?;

    let context = args.context()?;
    info!(base_url = %config.base_url, range = %context.anomaly_range, mode = %context.compare_mode, "requesting aggregates");

    let cache = AggregatesCache::new(HttpSliceFetcher::from_config(&config));
    settle(cache.request(&context, args.urns.iter().map(String::as_str))).await;

    let snapshot = cache.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    if !snapshot.errors.is_empty() {
        let mut failed: Vec<_> = snapshot.errors.iter().map(|u| u.to_string()).collect();
        failed.sort();
        eprintln!("{} {}", "failed:".red().bold(), failed.join(", "));
        std::process::exit(1);
    }

    eprintln!(
        "{} {} cached, {} pending",
        "ok:".green().bold(),
        snapshot.aggregates.len(),
        snapshot.pending.len()
    );
    Ok(())
}
