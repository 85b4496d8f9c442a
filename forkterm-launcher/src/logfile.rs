//! Per-fork log files: `<YYYY-MM-DD>_<summary>_<task id>.log`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use forkterm_core::TaskId;

use crate::error::{io_err, LaunchError};

/// Characters of the payload that feed the file-name summary.
pub const SUMMARY_CHARS: usize = 30;

pub const LOG_EXTENSION: &str = "log";

/// File-system safe summary of `payload`.
///
/// Keeps alphanumerics, `-` and `_` from the first [`SUMMARY_CHARS`]
/// characters, turns everything else into `-`, trims dashes and lowercases.
/// Falls back to `task` when nothing survives.
pub fn summarize(payload: &str) -> String {
    let replaced: String = payload
        .chars()
        .take(SUMMARY_CHARS)
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = replaced.trim_matches('-').to_lowercase();
    if trimmed.is_empty() {
        "task".to_string()
    } else {
        trimmed
    }
}

pub fn log_file_name(date: NaiveDate, payload: &str, id: &TaskId) -> String {
    format!(
        "{}_{}_{}.{LOG_EXTENSION}",
        date.format("%Y-%m-%d"),
        summarize(payload),
        id
    )
}

/// Log path for a fork started today (local time).
pub fn log_path_in(dir: &Path, payload: &str, id: &TaskId) -> PathBuf {
    let today = chrono::Local::now().date_naive();
    dir.join(log_file_name(today, payload, id))
}

/// Create the directory `log` will be written into.
pub(crate) fn ensure_parent(log: &Path) -> Result<(), LaunchError> {
    match log.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            tracing::debug!(dir = %dir.display(), "created log directory");
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_sanitized() {
        assert_eq!(summarize("Fix the \"auth\" bug && ship"), "fix-the--auth--bug----ship");
        assert_eq!(summarize("  ../../etc/passwd"), "etc-passwd");
        assert_eq!(summarize("&&&"), "task");
        assert_eq!(summarize("Überprüfe_Tests"), "überprüfe_tests");
    }

    #[test]
    fn summary_uses_first_thirty_chars() {
        let payload = "a".repeat(29) + "bcdef";
        assert_eq!(summarize(&payload), "a".repeat(29) + "b");
    }

    #[test]
    fn file_name_layout() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let name = log_file_name(date, "npm test", &TaskId::from("a1b2c3d4"));
        assert_eq!(name, "2026-03-07_npm-test_a1b2c3d4.log");
    }

    #[test]
    fn ensure_parent_creates_nested_dirs() {
        let root = tempfile::TempDir::new().unwrap();
        let log = root.path().join("logs/forks/x.log");
        ensure_parent(&log).unwrap();
        assert!(root.path().join("logs/forks").is_dir());
        assert!(!log.exists());
    }
}
