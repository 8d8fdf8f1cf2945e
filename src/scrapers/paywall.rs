//! Paywall detection for a single article page.
//!
//! The check is deliberately dumb: the publisher's subscription banner uses
//! stable wording, so an article counts as paywalled as soon as one of the
//! configured markers occurs as a literal, case-sensitive substring. The raw
//! HTML is scanned first; if nothing matches, the page's visible text is
//! scanned as well, which catches markers split across tags or separated by
//! entity-encoded whitespace.

use crate::error::ArticleFetchError;
use crate::models::{Classification, ScanPass};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Decides whether an article URL is free to read.
///
/// The pipeline is generic over this trait so tests can swap in canned
/// verdicts without a web server.
pub trait Classifier {
    async fn classify(&self, url: &str) -> Classification;
}

/// [`Classifier`] that downloads the article and scans it for markers.
#[derive(Debug, Clone)]
pub struct PaywallClassifier {
    client: reqwest::Client,
    timeout: Duration,
    markers: Vec<String>,
}

impl PaywallClassifier {
    pub fn new(client: reqwest::Client, timeout: Duration, markers: Vec<String>) -> Self {
        Self {
            client,
            timeout,
            markers,
        }
    }

    /// GET the article and return its body as text.
    async fn fetch_html(&self, url: &str) -> Result<String, ArticleFetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ArticleFetchError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArticleFetchError::HttpStatus(status.as_u16()));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                ArticleFetchError::Timeout
            } else {
                ArticleFetchError::Body(e)
            }
        })
    }
}

impl Classifier for PaywallClassifier {
    #[instrument(level = "debug", skip(self))]
    async fn classify(&self, url: &str) -> Classification {
        let html = match self.fetch_html(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "Article check failed");
                return Classification::CheckFailed(e);
            }
        };
        debug!(%url, bytes = html.len(), "Fetched article");

        match scan_page(&html, &self.markers) {
            Some((marker, pass)) => {
                info!(%url, %marker, %pass, "Paywall marker found");
                Classification::Paywalled {
                    marker: marker.to_string(),
                    pass,
                }
            }
            None => Classification::Free,
        }
    }
}

/// Scan raw HTML, then visible text, for the first marker present.
///
/// Returns the matching marker and the pass that found it, or `None` when the
/// page carries none of them.
pub fn scan_page<'m>(html: &str, markers: &'m [String]) -> Option<(&'m str, ScanPass)> {
    if let Some(marker) = find_marker(html, markers) {
        return Some((marker, ScanPass::RawHtml));
    }
    let text = visible_text(html);
    find_marker(&text, markers).map(|marker| (marker, ScanPass::VisibleText))
}

/// First marker, in configuration order, contained in `haystack`.
///
/// Plain substring containment: no word boundaries, no case folding.
pub fn find_marker<'m>(haystack: &str, markers: &'m [String]) -> Option<&'m str> {
    markers
        .iter()
        .map(String::as_str)
        .find(|marker| haystack.contains(marker))
}

/// Human-readable text of an HTML document.
///
/// Text inside script, style, noscript and template elements is skipped, as
/// are comments. Each text node is trimmed, empty ones dropped, the rest
/// joined with a space, and every whitespace run collapsed to one space.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut pieces: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }

    WHITESPACE_RUN
        .replace_all(&pieces.join(" "), " ")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PAYWALL_MARKERS;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn markers() -> Vec<String> {
        DEFAULT_PAYWALL_MARKERS.iter().map(|m| m.to_string()).collect()
    }

    fn classifier() -> PaywallClassifier {
        let client = crate::scrapers::build_client("cicero-free-rss-test/1.0").unwrap();
        PaywallClassifier::new(client, Duration::from_secs(5), markers())
    }

    #[test]
    fn test_find_marker_is_plain_substring() {
        let markers = markers();
        assert_eq!(
            find_marker("Das Monatsabolos-Angebot", &markers),
            Some("Monatsabo")
        );
        assert_eq!(find_marker("<div>JETZT TESTEN</div>", &markers), Some("JETZT TESTEN"));
        assert_eq!(find_marker("jetzt testen", &markers), None);
        assert_eq!(find_marker("", &markers), None);
    }

    #[test]
    fn test_find_marker_respects_configuration_order() {
        let markers = markers();
        // Both "Cicero-Plus" and the long banner text occur; the first one configured wins.
        assert_eq!(
            find_marker("Sie haben schon ein Cicero-Plus Abo?", &markers),
            Some("Cicero-Plus")
        );
    }

    #[test]
    fn test_visible_text_skips_scripts_styles_and_comments() {
        let html = r#"<html><head><title>Titel</title>
            <style>.x { content: "Monatsabo"; }</style>
            <script>var x = "JETZT TESTEN";</script></head>
            <body><!-- Cicero Plus -->
              <p>Erster   Absatz</p>
              <noscript>Cicero-Plus</noscript>
              <p>Zweiter<br>Absatz</p>
            </body></html>"#;

        assert_eq!(visible_text(html), "Titel Erster Absatz Zweiter Absatz");
    }

    #[test]
    fn test_marker_split_across_tags_is_found_in_visible_text() {
        let html = "<p>JETZT <strong>TESTEN</strong></p>";
        assert_eq!(
            scan_page(html, &markers()),
            Some(("JETZT TESTEN", ScanPass::VisibleText))
        );
    }

    #[test]
    fn test_marker_with_encoded_space_is_found_in_visible_text() {
        let html = "<span>Cicero&nbsp;Plus</span>";
        assert_eq!(
            scan_page(html, &markers()),
            Some(("Cicero Plus", ScanPass::VisibleText))
        );
    }

    #[test]
    fn test_marker_in_raw_html_wins_first() {
        let html = r#"<div data-product="Cicero-Plus"></div>"#;
        assert_eq!(
            scan_page(html, &markers()),
            Some(("Cicero-Plus", ScanPass::RawHtml))
        );
    }

    #[test]
    fn test_clean_page_has_no_marker() {
        let html = "<article><h1>Freier Text</h1><p>Alles lesbar.</p></article>";
        assert_eq!(scan_page(html, &markers()), None);
    }

    #[tokio::test]
    async fn test_classify_paywalled_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bezahlt"))
            .and(header("user-agent", "cicero-free-rss-test/1.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><a>JETZT TESTEN</a></body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let verdict = classifier()
            .classify(&format!("{}/bezahlt", server.uri()))
            .await;
        match verdict {
            Classification::Paywalled { marker, pass } => {
                assert_eq!(marker, "JETZT TESTEN");
                assert_eq!(pass, ScanPass::RawHtml);
            }
            other => panic!("Expected Paywalled, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_classify_free_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body><p>Frei</p></body></html>"),
            )
            .mount(&server)
            .await;

        let verdict = classifier().classify(&server.uri()).await;
        assert!(matches!(verdict, Classification::Free), "got {:?}", verdict);
    }

    #[tokio::test]
    async fn test_classify_failing_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let verdict = classifier().classify(&server.uri()).await;
        assert!(
            matches!(
                verdict,
                Classification::CheckFailed(ArticleFetchError::HttpStatus(404))
            ),
            "got {:?}",
            verdict
        );
    }

    #[tokio::test]
    async fn test_classify_network_error() {
        let verdict = classifier().classify("http://127.0.0.1:1/artikel").await;
        assert!(
            matches!(
                verdict,
                Classification::CheckFailed(ArticleFetchError::Network(_))
            ),
            "got {:?}",
            verdict
        );
    }

    #[tokio::test]
    async fn test_classify_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>langsam</p>")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let slow = PaywallClassifier::new(client, Duration::from_millis(200), markers());
        let verdict = slow.classify(&server.uri()).await;
        assert!(
            matches!(verdict, Classification::CheckFailed(ArticleFetchError::Timeout)),
            "got {:?}",
            verdict
        );
    }
}
