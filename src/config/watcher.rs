//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file, so editors that
//! save by writing a temp file and renaming it over the config keep
//! triggering reloads. Bursts of events are collapsed into one reload.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GateConfig;

/// Quiet period after the last file event before the config is re-read.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches one config file and sends every successfully reloaded config.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<GateConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GateConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            debounce: DEFAULT_DEBOUNCE,
            update_tx,
        };
        (watcher, update_rx)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// The returned watcher must be kept alive for events to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = watch_dir(&self.path);
        let file_name: Option<OsString> = self.path.file_name().map(OsStr::to_os_string);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if touches_file(&event, file_name.as_deref()) {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(reload_loop(self.path.clone(), self.debounce, event_rx, self.update_tx));

        tracing::info!(path = ?self.path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Writes, creations and renames that land on the watched file name.
fn touches_file(event: &Event, file_name: Option<&OsStr>) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    event.paths.iter().any(|p| p.file_name() == file_name)
}

async fn reload_loop(
    path: PathBuf,
    debounce: Duration,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<GateConfig>,
) {
    while events.recv().await.is_some() {
        // Wait for the burst to go quiet.
        loop {
            match tokio::time::timeout(debounce, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) | Err(_) => break,
            }
        }

        tracing::info!(path = ?path, "Config file change detected, reloading");
        match load_config(&path) {
            Ok(config) => {
                if updates.send(config).is_err() {
                    return;
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to reload config, keeping current configuration"),
        }
    }
}
