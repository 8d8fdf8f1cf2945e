//! Data models that flow through a single run.
//!
//! - [`FeedEntry`]: one upstream item, verbatim apart from defaulting
//! - [`Classification`]: the paywall verdict for one article
//! - [`RssItem`]: an entry that survived filtering, already XML-escaped
//! - [`FilteredFeed`]: the kept items plus their build timestamp
//! - [`RunStats`]: counters written to the diagnostics file
//!
//! Nothing here outlives the process.

use crate::error::ArticleFetchError;
use crate::filter::xml_escape;
use chrono::{DateTime, Utc};
use std::fmt;

/// One article reference from the upstream feed.
///
/// Missing text fields are empty strings. A missing `link` makes the entry
/// ineligible for the output feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: Option<String>,
    pub summary: String,
    /// Publication date as written upstream, or empty when the feed gave none.
    pub published: String,
}

/// Which scan found a paywall marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPass {
    RawHtml,
    VisibleText,
}

impl fmt::Display for ScanPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPass::RawHtml => f.write_str("raw_html"),
            ScanPass::VisibleText => f.write_str("visible_text"),
        }
    }
}

/// Paywall verdict for one article URL.
#[derive(Debug)]
pub enum Classification {
    Free,
    Paywalled { marker: String, pass: ScanPass },
    CheckFailed(ArticleFetchError),
}

/// A kept entry with every text field escaped for embedding in XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
}

impl RssItem {
    /// Escape the fields of an entry with a known link.
    pub fn escaped(entry: &FeedEntry, link: &str) -> Self {
        Self {
            title: xml_escape(&entry.title),
            link: xml_escape(link),
            pub_date: xml_escape(&entry.published),
            description: xml_escape(&entry.summary),
        }
    }
}

/// Kept entries in upstream order, with the time the feed was assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredFeed {
    pub items: Vec<RssItem>,
    pub built_at: DateTime<Utc>,
}

impl FilteredFeed {
    pub fn empty(built_at: DateTime<Utc>) -> Self {
        Self {
            items: Vec::new(),
            built_at,
        }
    }
}

/// Observational counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub http_status: Option<u16>,
    pub content_type: Option<String>,
    /// Entries in the upstream document, before truncation.
    pub upstream_entries: usize,
    /// Entries inside the `max_entries` window.
    pub considered: usize,
    pub kept: usize,
    pub dropped_paywalled: usize,
    pub dropped_no_link: usize,
    pub check_errors: usize,
}
