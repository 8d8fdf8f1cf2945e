//! Output generation for a finished run.
//!
//! - [`rss`]: renders the filtered feed as RSS 2.0
//! - [`debug`]: renders the diagnostics record
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── index.xml   # filtered feed, always well-formed
//! └── debug.txt   # key=value diagnostics of the last run
//! ```
//!
//! Both documents are rendered in memory before anything touches the disk.
//! Each is then written next to its destination as `<name>.tmp`, and only
//! once both temp files exist are they renamed into place. A failed write
//! therefore leaves the previous `index.xml` and `debug.txt` together.

pub mod debug;
pub mod rss;

use crate::config::Config;
use crate::error::WriteError;
use crate::pipeline::RunReport;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `index.xml` and `debug.txt` for a run.
///
/// # Errors
///
/// Any [`WriteError`] is fatal for the run.
#[instrument(level = "info", skip_all, fields(output_dir = %config.output_dir.display()))]
pub async fn write_run(config: &Config, report: &RunReport) -> Result<(), WriteError> {
    let feed_xml = rss::render_rss(&report.feed, &config.channel)?;
    let debug_txt = debug::render_debug(report);

    let feed_path = config.feed_path();
    let debug_path = config.debug_path();

    let feed_tmp = stage(&feed_path, feed_xml.as_bytes()).await?;
    let debug_tmp = match stage(&debug_path, debug_txt.as_bytes()).await {
        Ok(tmp) => tmp,
        Err(e) => {
            let _ = fs::remove_file(&feed_tmp).await;
            return Err(e);
        }
    };

    if let Err(e) = commit(&feed_tmp, &feed_path).await {
        let _ = fs::remove_file(&debug_tmp).await;
        return Err(e);
    }
    info!(path = %feed_path.display(), items = report.feed.items.len(), "Wrote filtered feed");

    commit(&debug_tmp, &debug_path).await?;
    info!(path = %debug_path.display(), "Wrote diagnostics");

    Ok(())
}

/// Write `contents` to the sibling temp file of `path` and return its path.
async fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf, WriteError> {
    let tmp = tmp_path(path);
    if let Err(source) = fs::write(&tmp, contents).await {
        error!(path = %tmp.display(), error = %source, "Failed to write temp file");
        let _ = fs::remove_file(&tmp).await;
        return Err(WriteError::Io { path: tmp, source });
    }
    Ok(tmp)
}

/// Move a staged temp file over its destination.
async fn commit(tmp: &Path, path: &Path) -> Result<(), WriteError> {
    if let Err(source) = fs::rename(tmp, path).await {
        error!(path = %path.display(), error = %source, "Failed to move temp file into place");
        let _ = fs::remove_file(tmp).await;
        return Err(WriteError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailPolicy;
    use crate::error::FetchError;
    use crate::models::{FilteredFeed, RunStats};
    use crate::pipeline::FeedFailure;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::backtrace::Backtrace;

    fn config_in(dir: &Path) -> Config {
        Config {
            output_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    fn report(outcome: Result<RunStats, FeedFailure>) -> RunReport {
        let run_at = Utc::now();
        RunReport {
            run_at,
            source: "https://www.cicero.de/rss.xml".to_string(),
            fail_policy: FailPolicy::Closed,
            feed: FilteredFeed::empty(run_at),
            outcome,
        }
    }

    #[test]
    fn test_tmp_path_is_a_sibling() {
        assert_eq!(
            tmp_path(Path::new("/srv/pages/index.xml")),
            PathBuf::from("/srv/pages/index.xml.tmp")
        );
    }

    #[tokio::test]
    async fn test_write_run_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        write_run(&config, &report(Ok(RunStats::default())))
            .await
            .unwrap();

        let xml = std::fs::read_to_string(dir.path().join("index.xml")).unwrap();
        assert!(xml.contains("<channel>"));
        assert!(xml.contains("<lastBuildDate>"));
        assert!(!xml.contains("<item>"));
        let debug = std::fs::read_to_string(dir.path().join("debug.txt")).unwrap();
        assert!(debug.contains("kept=0\n"));
        assert!(!dir.path().join("index.xml.tmp").exists());
        assert!(!dir.path().join("debug.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_run_after_feed_failure_still_publishes_empty_feed() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let failure = FeedFailure {
            error: FetchError::Timeout,
            backtrace: Backtrace::force_capture(),
        };

        write_run(&config, &report(Err(failure))).await.unwrap();

        let xml = std::fs::read_to_string(dir.path().join("index.xml")).unwrap();
        assert!(xml.contains("<channel>"));
        assert!(!xml.contains("<item>"));
        let debug = std::fs::read_to_string(dir.path().join("debug.txt")).unwrap();
        assert!(debug.contains("status=FEED_FETCH_FAILED\n"));
        assert!(debug.contains("error=feed request timed out\n"));
        assert!(debug.contains("traceback:\n"));
    }

    #[tokio::test]
    async fn test_write_run_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.xml"), "stale").unwrap();

        write_run(&config_in(dir.path()), &report(Ok(RunStats::default())))
            .await
            .unwrap();

        let xml = std::fs::read_to_string(dir.path().join("index.xml")).unwrap();
        assert!(xml.starts_with("<?xml"));
    }

    #[tokio::test]
    async fn test_failed_debug_write_keeps_previous_feed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.xml"), "previous").unwrap();
        let config = Config {
            debug_file: "missing/debug.txt".to_string(),
            ..config_in(dir.path())
        };

        let err = write_run(&config, &report(Ok(RunStats::default())))
            .await
            .unwrap_err();

        assert!(matches!(err, WriteError::Io { .. }), "got {:?}", err);
        let xml = std::fs::read_to_string(dir.path().join("index.xml")).unwrap();
        assert_eq!(xml, "previous");
        assert!(!dir.path().join("index.xml.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir.path().join("does/not/exist"));

        let err = write_run(&config, &report(Ok(RunStats::default())))
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }), "got {:?}", err);
    }
}
