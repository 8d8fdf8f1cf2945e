//! Feed filtering and item assembly.
//!
//! Entries are walked in upstream order, truncated to `max_entries`. Each
//! entry with a link is classified, one request at a time, with the pacer
//! invoked between consecutive checks. Free entries are escaped and kept;
//! paywalled ones are dropped; failed checks are resolved by the configured
//! [`FailPolicy`](crate::config::FailPolicy).

use crate::config::Config;
use crate::models::{Classification, FeedEntry, FilteredFeed, RssItem, RunStats};
use crate::pacing::Pacer;
use crate::scrapers::paywall::Classifier;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

/// Escape text for embedding in XML.
///
/// `&` is replaced first so the entities inserted for the other characters
/// are not escaped a second time.
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Classify the first `config.max_entries` entries and keep the free ones.
///
/// Returns the kept items, stamped with `built_at`, and the run counters.
/// `http_status` and `content_type` are left for the caller to fill in.
#[instrument(
    level = "info",
    skip_all,
    fields(upstream = entries.len(), max_entries = config.max_entries, fail_policy = %config.fail_policy)
)]
pub async fn filter_entries<C, P>(
    entries: &[FeedEntry],
    classifier: &C,
    pacer: &P,
    config: &Config,
    built_at: DateTime<Utc>,
) -> (FilteredFeed, RunStats)
where
    C: Classifier,
    P: Pacer,
{
    let mut stats = RunStats {
        upstream_entries: entries.len(),
        ..RunStats::default()
    };
    let mut items = Vec::new();
    let mut checks = 0usize;

    for (index, entry) in entries.iter().take(config.max_entries).enumerate() {
        stats.considered += 1;

        let Some(link) = entry.link.as_deref() else {
            stats.dropped_no_link += 1;
            debug!(index, title = %truncate_for_log(&entry.title, 80), "Entry has no link; dropping");
            continue;
        };

        if checks > 0 {
            pacer.pause().await;
        }
        checks += 1;

        let keep = match classifier.classify(link).await {
            Classification::Free => {
                debug!(index, %link, "Article is free");
                true
            }
            Classification::Paywalled { marker, pass } => {
                stats.dropped_paywalled += 1;
                debug!(index, %link, %marker, %pass, "Article is paywalled; dropping");
                false
            }
            Classification::CheckFailed(e) => {
                stats.check_errors += 1;
                let keep = config.fail_policy.keeps_unchecked();
                warn!(
                    index,
                    %link,
                    error = %e,
                    fail_policy = %config.fail_policy,
                    kept = keep,
                    "Paywall check failed; applying fail policy"
                );
                keep
            }
        };

        if keep {
            stats.kept += 1;
            items.push(RssItem::escaped(entry, link));
        }
    }

    info!(
        considered = stats.considered,
        kept = stats.kept,
        dropped_paywalled = stats.dropped_paywalled,
        dropped_no_link = stats.dropped_no_link,
        check_errors = stats.check_errors,
        "Filtered feed entries"
    );

    (FilteredFeed { items, built_at }, stats)
}
