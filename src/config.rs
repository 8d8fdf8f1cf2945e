//! Run configuration.
//!
//! A [`Config`] is built once at startup from three layers, lowest first:
//! the built-in defaults, an optional YAML file, and command-line flags.
//! After validation it is passed by reference into every component and never
//! mutated again.
//!
//! ```yaml
//! source_feed_url: https://www.cicero.de/rss.xml
//! output_dir: ./public
//! max_entries: 40
//! fail_policy: open
//! paywall_markers:
//!   - Cicero-Plus
//!   - Monatsabo
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_SOURCE_FEED_URL: &str = "https://www.cicero.de/rss.xml";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; cicero-free-rss/1.0)";
pub const DEFAULT_MAX_ENTRIES: usize = 40;

/// Literal substrings whose presence marks an article as paywalled.
pub const DEFAULT_PAYWALL_MARKERS: [&str; 5] = [
    "Cicero-Plus",
    "Cicero Plus",
    "JETZT TESTEN",
    "Monatsabo",
    "Sie haben schon ein Cicero-Plus Abo",
];

/// What to do with an entry whose paywall check could not be completed.
///
/// `Closed` drops the entry so a paid article can never leak into the output.
/// `Open` keeps it so an unreachable site does not empty the whole feed.
/// Either way the failure is counted in `check_errors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    /// Treat an unchecked article as paywalled
    #[default]
    Closed,
    /// Treat an unchecked article as free
    Open,
}

impl FailPolicy {
    /// Map a failed check to a keep (`true`) or drop (`false`) decision.
    pub fn keeps_unchecked(self) -> bool {
        matches!(self, FailPolicy::Open)
    }
}

impl fmt::Display for FailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailPolicy::Closed => f.write_str("closed"),
            FailPolicy::Open => f.write_str("open"),
        }
    }
}

/// Static metadata of the republished channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            title: "Cicero (free-only)".to_string(),
            link: "https://www.cicero.de/".to_string(),
            description: "Filtered RSS feed that removes Cicero+ paywalled articles".to_string(),
        }
    }
}

/// Immutable configuration for a single run.
///
/// Every key is optional in the YAML file; missing keys keep their default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_feed_url: String,
    pub output_dir: PathBuf,
    /// File name of the filtered feed inside `output_dir`.
    pub feed_file: String,
    /// File name of the diagnostics record inside `output_dir`.
    pub debug_file: String,
    /// Only this many upstream entries are considered, in feed order.
    pub max_entries: usize,
    pub article_timeout_secs: u64,
    pub feed_timeout_secs: u64,
    /// Courtesy pause between two article checks.
    pub pacing_delay_secs: f64,
    pub paywall_markers: Vec<String>,
    pub fail_policy: FailPolicy,
    pub user_agent: String,
    pub channel: ChannelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_feed_url: DEFAULT_SOURCE_FEED_URL.to_string(),
            output_dir: PathBuf::from("."),
            feed_file: "index.xml".to_string(),
            debug_file: "debug.txt".to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
            article_timeout_secs: 20,
            feed_timeout_secs: 30,
            pacing_delay_secs: 1.0,
            paywall_markers: DEFAULT_PAYWALL_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            fail_policy: FailPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            channel: ChannelConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration for this invocation: defaults, then the file
    /// named by `--config` (if any), then the remaining CLI flags.
    #[instrument(level = "info", skip_all)]
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match cli.config.as_deref() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        info!(
            source = %config.source_feed_url,
            output_dir = %config.output_dir.display(),
            max_entries = config.max_entries,
            fail_policy = %config.fail_policy,
            pacing_delay_secs = config.pacing_delay_secs,
            markers = config.paywall_markers.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Read a YAML configuration file. Keys absent from the file keep their
    /// default values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overlay the flags that were given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.source_url {
            self.source_feed_url = url.clone();
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(n) = cli.max_entries {
            self.max_entries = n;
        }
        if let Some(policy) = cli.fail_policy {
            self.fail_policy = policy;
        }
        if let Some(secs) = cli.pacing_delay {
            self.pacing_delay_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.source_feed_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "source_feed_url {:?} is not a valid URL: {e}",
                self.source_feed_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "source_feed_url must use http or https, got {:?}",
                url.scheme()
            )));
        }
        if self.paywall_markers.is_empty() {
            return Err(ConfigError::Invalid(
                "paywall_markers must not be empty".to_string(),
            ));
        }
        // An empty marker is a substring of every page.
        if self.paywall_markers.iter().any(|m| m.is_empty()) {
            return Err(ConfigError::Invalid(
                "paywall_markers must not contain an empty string".to_string(),
            ));
        }
        if self.article_timeout_secs == 0 || self.feed_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeouts must be at least one second".to_string(),
            ));
        }
        if let Err(e) = Duration::try_from_secs_f64(self.pacing_delay_secs) {
            return Err(ConfigError::Invalid(format!(
                "pacing_delay_secs must be a non-negative number of seconds, got {}: {e}",
                self.pacing_delay_secs
            )));
        }
        if self.feed_file.is_empty() || self.debug_file.is_empty() {
            return Err(ConfigError::Invalid(
                "output file names must not be empty".to_string(),
            ));
        }
        if self.feed_file == self.debug_file {
            return Err(ConfigError::Invalid(
                "feed_file and debug_file must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn article_timeout(&self) -> Duration {
        Duration::from_secs(self.article_timeout_secs)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    /// Only meaningful on a validated config; an out-of-range delay falls
    /// back to no pacing.
    pub fn pacing_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.pacing_delay_secs).unwrap_or_default()
    }

    pub fn feed_path(&self) -> PathBuf {
        self.output_dir.join(&self.feed_file)
    }

    pub fn debug_path(&self) -> PathBuf {
        self.output_dir.join(&self.debug_file)
    }
}
