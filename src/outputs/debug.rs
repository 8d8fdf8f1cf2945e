//! Plain-text diagnostics record (`debug.txt`).
//!
//! One `key=value` pair per line. A failed upstream fetch replaces the
//! counters with a `status=FEED_FETCH_FAILED` marker, the error message, and
//! a `traceback:` block holding the cause chain and the captured backtrace.

use crate::error::FetchError;
use crate::models::RunStats;
use crate::pipeline::{FeedFailure, RunReport};
use chrono::SecondsFormat;
use std::error::Error;
use std::fmt::Write;

pub const FETCH_FAILED_MARKER: &str = "FEED_FETCH_FAILED";

pub fn render_debug(report: &RunReport) -> String {
    let mut out = String::new();
    line(
        &mut out,
        "run_at",
        &report.run_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    line(&mut out, "source", &report.source);
    line(&mut out, "fail_policy", &report.fail_policy.to_string());

    match &report.outcome {
        Ok(stats) => write_stats(&mut out, stats),
        Err(failure) => write_failure(&mut out, failure),
    }
    out
}

fn write_stats(out: &mut String, stats: &RunStats) {
    line(
        out,
        "http_status",
        &stats.http_status.map(|s| s.to_string()).unwrap_or_default(),
    );
    line(
        out,
        "content_type",
        stats.content_type.as_deref().unwrap_or_default(),
    );
    line(out, "upstream_entries", &stats.upstream_entries.to_string());
    line(out, "considered", &stats.considered.to_string());
    line(out, "kept", &stats.kept.to_string());
    line(out, "dropped_paywalled", &stats.dropped_paywalled.to_string());
    line(out, "dropped_no_link", &stats.dropped_no_link.to_string());
    line(out, "check_errors", &stats.check_errors.to_string());
}

fn write_failure(out: &mut String, failure: &FeedFailure) {
    line(out, "status", FETCH_FAILED_MARKER);
    line(out, "error", &failure.error.to_string());
    if let FetchError::HttpStatus {
        status,
        content_type,
    } = &failure.error
    {
        line(out, "http_status", &status.to_string());
        line(out, "content_type", content_type.as_deref().unwrap_or_default());
    }

    out.push_str("traceback:\n");
    let _ = writeln!(out, "{:?}", failure.error);
    let mut source = failure.error.source();
    while let Some(cause) = source {
        let _ = writeln!(out, "caused by: {cause}");
        source = cause.source();
    }
    let _ = writeln!(out, "{}", failure.backtrace);
}

/// Values are kept on one line so the record stays line-oriented.
fn line(out: &mut String, key: &str, value: &str) {
    let value = value.replace(['\r', '\n'], " ");
    let _ = writeln!(out, "{key}={value}");
}
