//! Upstream feed retrieval.
//!
//! The feed is fetched once per run with a single GET. The HTTP status and
//! `Content-Type` are kept for the diagnostics record; the body is parsed
//! with `feed-rs`, which accepts RSS 0.9x/2.0, Atom and JSON Feed.

use crate::error::FetchError;
use crate::models::FeedEntry;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A successfully parsed upstream feed with its transport metadata.
#[derive(Debug)]
pub struct FetchedFeed {
    pub entries: Vec<FeedEntry>,
    pub http_status: u16,
    pub content_type: Option<String>,
}

/// Fetch and parse the upstream feed.
///
/// # Errors
///
/// - [`FetchError::Timeout`] when the request exceeds `timeout`
/// - [`FetchError::Network`] for transport failures
/// - [`FetchError::HttpStatus`] for any non-2xx answer
/// - [`FetchError::Body`] when the body cannot be read
/// - [`FetchError::Parse`] when the body is not a feed
#[instrument(level = "info", skip(client, timeout))]
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<FetchedFeed, FetchError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(FetchError::from_request)?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    debug!(status = status.as_u16(), ?content_type, "Feed responded");

    if !status.is_success() {
        warn!(status = status.as_u16(), "Feed request returned a failing status");
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
            content_type,
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Body(e)
        }
    })?;

    let base = Url::parse(url).ok();
    let entries = parse_entries(&bytes, base.as_ref())?;
    info!(
        entries = entries.len(),
        bytes = bytes.len(),
        "Parsed upstream feed"
    );

    Ok(FetchedFeed {
        entries,
        http_status: status.as_u16(),
        content_type,
    })
}

/// Parse a feed document into entries, in document order.
///
/// Relative links are resolved against `base` when one is given. Links that
/// are empty after trimming are treated as absent; an item without one falls
/// back to a permalink `guid`/`id`. Publication dates are copied as written
/// upstream whenever the raw text can be recovered.
pub fn parse_entries(
    bytes: &[u8],
    base: Option<&Url>,
) -> Result<Vec<FeedEntry>, feed_rs::parser::ParseFeedError> {
    let feed = feed_rs::parser::parse(bytes)?;

    let raw_dates = raw_entry_dates(bytes).filter(|dates| dates.len() == feed.entries.len());
    if raw_dates.is_none() {
        debug!("Raw entry dates unavailable; rendering parsed timestamps");
    }

    let entries = feed
        .entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.trim())
                .filter(|href| !href.is_empty())
                .map(|href| resolve_link(href, base))
                .or_else(|| permalink_id(&entry.id));
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();
            let published = raw_dates
                .as_ref()
                .and_then(|dates| dates[i].clone())
                .or_else(|| entry.published.or(entry.updated).map(|dt| dt.to_rfc2822()))
                .unwrap_or_default();

            FeedEntry {
                title,
                link,
                summary,
                published,
            }
        })
        .collect();

    Ok(entries)
}

/// An entry id that is itself an absolute web URL, as RSS permalink guids are.
fn permalink_id(id: &str) -> Option<String> {
    let id = id.trim();
    let url = Url::parse(id).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| id.to_string())
}

/// Raw date text slots of one `<item>`/`<entry>`.
#[derive(Debug, Default)]
struct RawDates {
    published: Option<String>,
    updated: Option<String>,
}

impl RawDates {
    fn slot(&mut self, tag: &[u8]) -> Option<&mut Option<String>> {
        match tag {
            b"pubDate" | b"published" | b"date" | b"issued" => Some(&mut self.published),
            b"updated" | b"modified" => Some(&mut self.updated),
            _ => None,
        }
    }
}

/// Publication date text of every item, exactly as written in the document.
///
/// Only direct children of `<item>`/`<entry>` are read, so an Atom
/// `<source><updated>` does not leak into its entry. Returns `None` when the
/// body is not XML (JSON Feed) or cannot be walked to the end.
fn raw_entry_dates(bytes: &[u8]) -> Option<Vec<Option<String>>> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut dates = Vec::new();

    let mut depth = 0usize;
    let mut entry_depth: Option<usize> = None;
    let mut current = RawDates::default();
    let mut field: Option<Vec<u8>> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match entry_depth {
                    None if matches!(name.as_ref(), b"item" | b"entry") => {
                        entry_depth = Some(depth);
                        current = RawDates::default();
                    }
                    Some(d) if depth == d + 1 => {
                        field = Some(name.as_ref().to_vec());
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) if field.is_some() => text.push_str(&String::from_utf8_lossy(&t)),
            Ok(Event::CData(t)) if field.is_some() => text.push_str(&String::from_utf8_lossy(&t)),
            Ok(Event::End(_)) => {
                if let Some(d) = entry_depth {
                    if depth == d + 1 {
                        if let Some(tag) = field.take() {
                            let value = text.trim();
                            if let Some(slot) = current.slot(&tag) {
                                if slot.is_none() && !value.is_empty() {
                                    *slot = Some(value.to_string());
                                }
                            }
                        }
                    } else if depth == d {
                        let done = std::mem::take(&mut current);
                        dates.push(done.published.or(done.updated));
                        entry_depth = None;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }

    Some(dates)
}

fn resolve_link(href: &str, base: Option<&Url>) -> String {
    match base {
        Some(base) => match base.join(href) {
            Ok(resolved) => resolved.to_string(),
            Err(e) => {
                debug!(%href, error = %e, "Could not resolve entry link; keeping it verbatim");
                href.to_string()
            }
        },
        None => href.to_string(),
    }
}
