//! Command-line interface definitions for the free-only feed builder.
//!
//! Every flag is optional: a bare `cicero_free_rss` runs the built-in
//! defaults, which is how the scheduled job invokes it. Flags override the
//! values from the optional YAML file given with `--config`.

use crate::config::FailPolicy;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Scheduled run with defaults, writes ./index.xml and ./debug.txt
/// cicero_free_rss
///
/// # Publish into a pages directory and keep articles that could not be checked
/// cicero_free_rss --output-dir ./public --fail-policy open
///
/// # Signal an unreachable upstream feed through the exit status
/// cicero_free_rss --config ./filter.yaml --strict
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// URL of the upstream RSS/Atom feed
    #[arg(long, env = "SOURCE_FEED_URL")]
    pub source_url: Option<String>,

    /// Directory receiving the feed and debug files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of upstream entries to consider
    #[arg(short = 'n', long)]
    pub max_entries: Option<usize>,

    /// Keep (open) or drop (closed) articles whose paywall check failed
    #[arg(long, value_enum)]
    pub fail_policy: Option<FailPolicy>,

    /// Seconds to wait between two article checks
    #[arg(long)]
    pub pacing_delay: Option<f64>,

    /// Exit with status 2 when the upstream feed could not be fetched
    #[arg(long)]
    pub strict: bool,
}
