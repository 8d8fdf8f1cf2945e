//! # Cicero Free RSS
//!
//! Republishes a publisher's RSS feed with the paywalled articles removed.
//! Each linked article is downloaded and scanned for the wording of the
//! subscription banner; only articles without it make it into the output.
//!
//! ## Usage
//!
//! ```sh
//! cicero_free_rss                       # defaults, writes ./index.xml and ./debug.txt
//! cicero_free_rss -o ./public --fail-policy open
//! ```
//!
//! ## Architecture
//!
//! One sequential pass per invocation, meant to be triggered by a scheduler:
//! 1. **Fetch**: download and parse the upstream feed
//! 2. **Classify**: check each of the first N linked articles, one at a time
//! 3. **Assemble**: escape the free entries and build the output feed
//! 4. **Output**: atomically write `index.xml` and `debug.txt`
//!
//! An unreachable upstream feed still produces a valid, empty `index.xml`
//! and exits 0 (or 2 with `--strict`). Only an unusable output directory or
//! a failed write makes the process fail.

use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod filter;
mod models;
mod outputs;
mod pacing;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::Config;
use pacing::FixedDelay;
use scrapers::paywall::PaywallClassifier;
use utils::ensure_writable_dir;

/// Exit status for `--strict` runs whose upstream fetch failed.
const EXIT_FEED_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "cicero_free_rss starting up");

    let args = Cli::parse();
    let config = Config::from_cli(&args)?;
    info!(
        fail_policy = %config.fail_policy,
        "Articles whose paywall check fails will be {}",
        if config.fail_policy.keeps_unchecked() { "kept" } else { "dropped" }
    );

    // Fail before touching the network if the results could not be published.
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let client = scrapers::build_client(&config.user_agent)?;
    let classifier = PaywallClassifier::new(
        client.clone(),
        config.article_timeout(),
        config.paywall_markers.clone(),
    );
    let pacer = FixedDelay::new(config.pacing_delay());

    let report = pipeline::run(&config, &client, &classifier, &pacer).await;

    if let Err(e) = outputs::write_run(&config, &report).await {
        error!(error = %e, "Failed to write output files");
        return Err(e.into());
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        items = report.feed.items.len(),
        feed_failed = report.feed_failed(),
        "Execution complete"
    );

    if report.feed_failed() && args.strict {
        warn!("Upstream feed could not be fetched; exiting with failure status (--strict)");
        return Ok(ExitCode::from(EXIT_FEED_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}
