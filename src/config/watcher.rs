//! Configuration file watcher for hot reload.
//!
//! Every successful reload produces a whole new [`DashboardConfig`] on the
//! update channel. Bursts of file events are collapsed into one reload once
//! the file has been quiet for the debounce window. A file that is blank,
//! fails to load or fails to validate is logged and ignored; the running
//! snapshot stays in place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::reload_config;
use crate::config::schema::DashboardConfig;

/// Quiet period after the last file event before reloading.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<DashboardConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<DashboardConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                debounce: DEFAULT_DEBOUNCE,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching the file. Must be called inside a Tokio runtime.
    /// Watching stops when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tokio::spawn(debounce_reloads(
            self.path.clone(),
            event_rx,
            self.update_tx,
            self.debounce,
        ));

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Reload once per burst of file events. Ends when the event sender (the
/// notify watcher) is dropped.
async fn debounce_reloads(
    path: PathBuf,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<DashboardConfig>,
    quiet: Duration,
) {
    while events.recv().await.is_some() {
        let mut watcher_gone = false;
        loop {
            match tokio::time::timeout(quiet, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => {
                    watcher_gone = true;
                    break;
                }
                Err(_) => break,
            }
        }

        tracing::info!(path = ?path, "Config file changed, reloading");
        match reload_config(&path) {
            Ok(new_config) => {
                if updates.send(new_config).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
            }
        }

        if watcher_gone {
            return;
        }
    }
}
