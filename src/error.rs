//! Error types for each stage of a run.
//!
//! Only [`WriteError`] and [`ConfigError`] are allowed to end the process.
//! [`FetchError`] turns into an empty feed plus a diagnostic record, and
//! [`ArticleFetchError`] is folded into a keep/drop decision by the active
//! fail policy.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to retrieve or parse the upstream feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, TLS and other transport failures
    #[error("feed request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The feed request exceeded its timeout
    #[error("feed request timed out")]
    Timeout,
    /// Upstream answered with a non-2xx status
    #[error("feed returned HTTP {status}")]
    HttpStatus {
        status: u16,
        content_type: Option<String>,
    },
    /// The response body could not be read to the end
    #[error("failed to read feed body: {0}")]
    Body(#[source] reqwest::Error),
    /// The body is not an RSS or Atom document
    #[error("failed to parse feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

impl FetchError {
    pub(crate) fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

/// Failure to retrieve a single article page.
#[derive(Debug, Error)]
pub enum ArticleFetchError {
    #[error("article request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("article request timed out")]
    Timeout,
    #[error("article returned HTTP {0}")]
    HttpStatus(u16),
    #[error("failed to read article body: {0}")]
    Body(#[source] reqwest::Error),
}

impl ArticleFetchError {
    pub(crate) fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ArticleFetchError::Timeout
        } else {
            ArticleFetchError::Network(err)
        }
    }
}

/// Failure to persist the run's output. Fatal for the process.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render RSS document: {0}")]
    Render(#[source] io::Error),
}

/// Failure to load or validate configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid YAML in config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
