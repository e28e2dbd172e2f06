//! Deployment file watcher for watch mode.
//!
//! # Design Decisions
//! - Watches the parent directory: editors often save by rename, which
//!   drops a watch placed on the file itself
//! - A save that leaves the file text unchanged is not forwarded
//! - Invalid files are logged and skipped; the last good plan stays current

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::DeploymentConfig;

/// Forwards every changed, valid version of one deployment file.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<DeploymentConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<DeploymentConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let mut last = fs::read_to_string(&path).ok();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &path) => {
                    if let Some(config) = reload(&path, &mut last) {
                        tracing::info!(path = %path.display(), "Deployment file changed, re-planning");
                        let _ = tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Deployment watcher started");
        Ok(watcher)
    }
}

fn touches(event: &Event, path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p.file_name() == path.file_name())
}

/// Re-read `path`; yields a config only when the text changed and is valid.
fn reload(path: &Path, last: &mut Option<String>) -> Option<DeploymentConfig> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Deployment file unreadable");
            return None;
        }
    };
    if last.as_deref() == Some(text.as_str()) {
        tracing::debug!(path = %path.display(), "Deployment file unchanged");
        return None;
    }

    match parse_config(&text) {
        Ok(config) => {
            *last = Some(text);
            Some(config)
        }
        Err(e) => {
            tracing::error!(error = %e, "Deployment file rejected, keeping last plan");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reload_skips_unchanged_and_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "stack = \"one\"").unwrap();
        let mut last = None;

        let first = reload(file.path(), &mut last).unwrap();
        assert_eq!(first.stack, "one");
        assert!(reload(file.path(), &mut last).is_none());

        fs::write(file.path(), "stack = \"\"").unwrap();
        assert!(reload(file.path(), &mut last).is_none());
        assert_eq!(last.as_deref(), Some("stack = \"one\""));

        fs::write(file.path(), "stack = \"two\"").unwrap();
        assert_eq!(reload(file.path(), &mut last).unwrap().stack, "two");
    }
}
