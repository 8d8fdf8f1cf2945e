//! One complete run: fetch the upstream feed, filter it, report.
//!
//! A failed upstream fetch does not abort the run. It yields an empty
//! [`FilteredFeed`] and a [`FeedFailure`] carrying the error and a captured
//! backtrace, so the writer can still publish a valid feed and a full
//! diagnostic record.

use crate::config::{Config, FailPolicy};
use crate::error::FetchError;
use crate::filter::filter_entries;
use crate::models::{FilteredFeed, RunStats};
use crate::pacing::Pacer;
use crate::scrapers::feed::fetch_feed;
use crate::scrapers::paywall::Classifier;
use chrono::{DateTime, Utc};
use std::backtrace::Backtrace;
use tracing::{error, info, instrument};

/// The upstream feed could not be fetched or parsed.
#[derive(Debug)]
pub struct FeedFailure {
    pub error: FetchError,
    pub backtrace: Backtrace,
}

/// Everything the output writer needs about a run.
#[derive(Debug)]
pub struct RunReport {
    pub run_at: DateTime<Utc>,
    pub source: String,
    pub fail_policy: FailPolicy,
    pub feed: FilteredFeed,
    pub outcome: Result<RunStats, FeedFailure>,
}

impl RunReport {
    pub fn feed_failed(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Execute one run against `config.source_feed_url`.
#[instrument(level = "info", skip_all, fields(source = %config.source_feed_url))]
pub async fn run<C, P>(
    config: &Config,
    client: &reqwest::Client,
    classifier: &C,
    pacer: &P,
) -> RunReport
where
    C: Classifier,
    P: Pacer,
{
    let run_at = Utc::now();

    let (feed, outcome) =
        match fetch_feed(client, &config.source_feed_url, config.feed_timeout()).await {
            Ok(fetched) => {
                info!(
                    status = fetched.http_status,
                    content_type = ?fetched.content_type,
                    entries = fetched.entries.len(),
                    "Fetched upstream feed"
                );
                let (feed, mut stats) =
                    filter_entries(&fetched.entries, classifier, pacer, config, run_at).await;
                stats.http_status = Some(fetched.http_status);
                stats.content_type = fetched.content_type;
                (feed, Ok(stats))
            }
            Err(e) => {
                let backtrace = Backtrace::force_capture();
                error!(error = %e, "Upstream feed fetch failed; publishing an empty feed");
                (
                    FilteredFeed::empty(run_at),
                    Err(FeedFailure {
                        error: e,
                        backtrace,
                    }),
                )
            }
        };

    RunReport {
        run_at,
        source: config.source_feed_url.clone(),
        fail_policy: config.fail_policy,
        feed,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::NoPacing;
    use crate::scrapers::build_client;
    use crate::scrapers::paywall::PaywallClassifier;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed_with_links(base: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Cicero</title>
  <link>https://www.cicero.de/</link>
  <description>Upstream</description>
  <item><title>A</title><description>ohne Link</description></item>
  <item><title>B</title><link>{base}/b</link></item>
  <item><title>C</title><link>{base}/c</link></item>
</channel></rss>"#
        )
    }

    async fn mount_page(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    fn test_config(source: String, policy: FailPolicy) -> Config {
        Config {
            source_feed_url: source,
            fail_policy: policy,
            ..Config::default()
        }
    }

    async fn run_against(config: &Config) -> RunReport {
        let client = build_client(&config.user_agent).unwrap();
        let classifier = PaywallClassifier::new(
            client.clone(),
            Duration::from_secs(5),
            config.paywall_markers.clone(),
        );
        run(config, &client, &classifier, &NoPacing).await
    }

    #[tokio::test]
    async fn test_run_keeps_only_the_free_article() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(feed_with_links(&server.uri()), "application/rss+xml"),
            )
            .mount(&server)
            .await;
        mount_page(&server, "/b", 200, "<div class=\"paywall\">JETZT TESTEN</div>").await;
        mount_page(&server, "/c", 200, "<article><p>Frei lesbar.</p></article>").await;

        let config = test_config(format!("{}/rss.xml", server.uri()), FailPolicy::Closed);
        let report = run_against(&config).await;

        assert!(!report.feed_failed());
        assert_eq!(report.feed.items.len(), 1);
        assert_eq!(report.feed.items[0].title, "C");
        let stats = report.outcome.unwrap();
        assert_eq!(
            stats,
            RunStats {
                http_status: Some(200),
                content_type: Some("application/rss+xml".to_string()),
                upstream_entries: 3,
                considered: 3,
                kept: 1,
                dropped_paywalled: 1,
                dropped_no_link: 1,
                check_errors: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_run_applies_fail_policy_to_unreachable_articles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_with_links(&server.uri())))
            .mount(&server)
            .await;
        mount_page(&server, "/b", 500, "").await;
        mount_page(&server, "/c", 200, "<p>frei</p>").await;

        let source = format!("{}/rss.xml", server.uri());

        let closed = run_against(&test_config(source.clone(), FailPolicy::Closed)).await;
        let titles: Vec<_> = closed.feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["C"]);
        assert_eq!(closed.outcome.unwrap().check_errors, 1);

        let open = run_against(&test_config(source, FailPolicy::Open)).await;
        let titles: Vec<_> = open.feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "C"]);
        assert_eq!(open.outcome.unwrap().check_errors, 1);
    }

    #[tokio::test]
    async fn test_run_survives_unreachable_feed() {
        let config = test_config("http://127.0.0.1:1/rss.xml".to_string(), FailPolicy::Closed);
        let report = run_against(&config).await;

        assert!(report.feed_failed());
        assert!(report.feed.items.is_empty());
        let failure = report.outcome.unwrap_err();
        assert!(matches!(failure.error, FetchError::Network(_)), "got {:?}", failure.error);
    }
}
