//! Latest-status extraction from the presence log.
//!
//! The collaboration client appends a status line of the form
//! `StatusIndicatorStateService: Added <Token>` every time the user's
//! availability changes. The most recent such line is the user's current
//! presence — except for the `NewActivity` token, which marks a transient
//! notification event rather than an availability value and is skipped.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::reverse::ReverseLineScanner;

/// Sentinel returned when no presence value is available. Distinct from an
/// error: a missing or not-yet-written log is a normal state.
pub const NO_DATA: &str = "N/A";

/// Token that never counts as a presence value.
const EXCLUDED_TOKEN: &str = "NewActivity";

static STATUS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"StatusIndicatorStateService: Added (\w+)").expect("static pattern"));

/// Returns the most recent presence token in the log, or [`NO_DATA`].
///
/// Scans the file backward and stops at the first matching line, so only the
/// tail of a large log is ever read. Every call re-scans from the current end
/// of file; nothing is cached. Any scan failure — file missing, unreadable,
/// vanished mid-read — degrades to the sentinel.
pub fn extract_latest(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let scanner = match ReverseLineScanner::open(path) {
        Ok(scanner) => scanner,
        Err(e) => {
            debug!(path = %path.display(), "Presence log not readable: {e}");
            return NO_DATA.to_string();
        }
    };

    for line in scanner {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!(path = %path.display(), "Presence scan aborted: {e}");
                return NO_DATA.to_string();
            }
        };
        if let Some(captures) = STATUS_PATTERN.captures(&line) {
            let token = &captures[1];
            if token != EXCLUDED_TOKEN {
                return token.to_string();
            }
        }
    }

    NO_DATA.to_string()
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use tempfile::TempDir;

    use super::*;

    fn log_with(dir: &TempDir, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("logs.txt");
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn returns_most_recent_status_token() {
        let dir = TempDir::new().unwrap();
        let path = log_with(
            &dir,
            &[
                "Wed Jan 10 09:00:01 StatusIndicatorStateService: Added Available",
                "Wed Jan 10 09:12:44 StatusIndicatorStateService: Added Busy",
                "Wed Jan 10 09:13:02 some unrelated log noise",
            ],
        );
        assert_eq!(extract_latest(&path), "Busy");
    }

    #[test]
    fn skips_the_transient_new_activity_token() {
        let dir = TempDir::new().unwrap();
        let path = log_with(
            &dir,
            &[
                "StatusIndicatorStateService: Added Away",
                "StatusIndicatorStateService: Added NewActivity",
            ],
        );
        assert_eq!(extract_latest(&path), "Away");
    }

    #[test]
    fn only_new_activity_in_log_means_no_data() {
        let dir = TempDir::new().unwrap();
        let path = log_with(&dir, &["StatusIndicatorStateService: Added NewActivity"]);
        assert_eq!(extract_latest(&path), NO_DATA);
    }

    #[test]
    fn no_matching_line_means_no_data() {
        let dir = TempDir::new().unwrap();
        let path = log_with(&dir, &["startup", "heartbeat", "shutdown"]);
        assert_eq!(extract_latest(&path), NO_DATA);
    }

    #[test]
    fn missing_file_means_no_data() {
        let dir = TempDir::new().unwrap();
        assert_eq!(extract_latest(dir.path().join("absent.txt")), NO_DATA);
    }

    #[test]
    fn rescans_from_the_current_end_of_file() {
        let dir = TempDir::new().unwrap();
        let path = log_with(&dir, &["StatusIndicatorStateService: Added Available"]);
        assert_eq!(extract_latest(&path), "Available");

        let mut appender = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(appender, "StatusIndicatorStateService: Added DoNotDisturb").unwrap();
        assert_eq!(extract_latest(&path), "DoNotDisturb");
    }
}
