//! HTTP-facing stages of the pipeline.
//!
//! - [`feed`]: downloads the upstream RSS/Atom document and turns it into
//!   [`FeedEntry`](crate::models::FeedEntry) values
//! - [`paywall`]: downloads one article page and decides whether it sits
//!   behind the subscription wall
//!
//! Both share a single [`reqwest::Client`] built by [`build_client`], so every
//! request carries the same `User-Agent`. Timeouts are set per request since
//! the feed and the articles use different limits.

pub mod feed;
pub mod paywall;

use tracing::debug;

/// Build the shared HTTP client with the configured client identifier.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    debug!(%user_agent, "Building HTTP client");
    reqwest::Client::builder().user_agent(user_agent).build()
}
