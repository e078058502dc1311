//! External screen-ambience helper invocation.
//!
//! When a state-changing publish succeeds, an optional helper binary is told
//! to resume or suspend the ambient lighting. The helper is fire-and-forget:
//! its output and exit status are logged, and no failure of the helper ever
//! blocks or fails the sensor pipeline.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info, warn};

/// Launcher for the configured ambience helper binary.
#[derive(Debug, Clone)]
pub struct AmbienceHelper {
    path: PathBuf,
}

impl AmbienceHelper {
    /// Accepts the configured path if it points at an existing file;
    /// anything else disables the helper.
    pub fn from_path(path: &str) -> Option<Self> {
        if path.is_empty() {
            return None;
        }
        let path = Path::new(path);
        if !path.is_file() {
            warn!(path = %path.display(), "Ambience helper not found, disabled");
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
        })
    }

    /// The argument passed for a given enablement state.
    pub fn argument(enabled: bool) -> &'static str {
        if enabled {
            "--resume"
        } else {
            "--suspend"
        }
    }

    /// Runs the helper and logs its outcome. Never returns an error.
    pub async fn run(&self, enabled: bool) {
        let arg = Self::argument(enabled);
        debug!(path = %self.path.display(), arg, "Running ambience helper");

        match Command::new(&self.path).arg(arg).output().await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                info!(
                    status = %output.status,
                    output = %stdout.trim(),
                    "Ambience helper finished"
                );
            }
            Err(e) => warn!(path = %self.path.display(), "Ambience helper failed to start: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_selection() {
        assert_eq!(AmbienceHelper::argument(true), "--resume");
        assert_eq!(AmbienceHelper::argument(false), "--suspend");
    }

    #[test]
    fn empty_or_missing_path_disables_the_helper() {
        assert!(AmbienceHelper::from_path("").is_none());
        assert!(AmbienceHelper::from_path("/nonexistent/ambience-remote").is_none());
    }

    #[tokio::test]
    async fn run_never_fails_even_for_vanished_binaries() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("helper");
        std::fs::write(&path, b"#!/bin/sh\nexit 0\n").unwrap();

        let helper = AmbienceHelper::from_path(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();
        // Binary vanished between configuration and invocation; run just logs.
        helper.run(true).await;
    }

    #[tokio::test]
    async fn run_captures_helper_output() {
        let helper = AmbienceHelper::from_path("/bin/echo");
        if let Some(helper) = helper {
            helper.run(false).await;
        }
    }
}
