use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::event::DaemonEvent;

pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 500;
pub const DEFAULT_IMPORT_INTERVAL_MS: u64 = 500;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_RETENTION_SECS: u64 = 600;
pub const DEFAULT_RECENCY_SECS: u64 = 180;

pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;
pub const MIN_SWEEP_INTERVAL_SECS: u64 = 1;
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 86_400;
pub const MIN_RETENTION_SECS: u64 = 10;
pub const MAX_RETENTION_SECS: u64 = 7 * 86_400;
pub const MIN_RECENCY_SECS: u64 = 1;
pub const MAX_RECENCY_SECS: u64 = 86_400;

/// Root configuration structure. Deserialized from `<config dir>/ClipMirror/config.toml`.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Timing and startup behaviour of a monitoring session.
///
/// Raw values are kept as written; the accessor methods clamp them.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MonitorConfig {
    /// How often the clipboard is polled for new text.
    #[serde(default = "default_capture_interval")]
    pub capture_interval_ms: u64,
    /// How often the directory is polled for artifacts to import.
    #[serde(default = "default_import_interval")]
    pub import_interval_ms: u64,
    /// How often expired artifacts are swept.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Artifacts older than this are deleted.
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
    /// Only artifacts at most this old are imported into the clipboard.
    #[serde(default = "default_recency")]
    pub recency_secs: u64,
    /// Start monitoring at launch when a saved directory exists.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capture_interval_ms: DEFAULT_CAPTURE_INTERVAL_MS,
            import_interval_ms: DEFAULT_IMPORT_INTERVAL_MS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            retention_secs: DEFAULT_RETENTION_SECS,
            recency_secs: DEFAULT_RECENCY_SECS,
            auto_start: true,
        }
    }
}

impl MonitorConfig {
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(
            self.capture_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }

    pub fn import_interval(&self) -> Duration {
        Duration::from_millis(
            self.import_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.sweep_interval_secs
                .clamp(MIN_SWEEP_INTERVAL_SECS, MAX_SWEEP_INTERVAL_SECS),
        )
    }

    /// Retention window in seconds, clamped.
    pub fn retention_secs(&self) -> u64 {
        self.retention_secs.clamp(MIN_RETENTION_SECS, MAX_RETENTION_SECS)
    }

    /// Recency window in seconds, clamped.
    pub fn recency_secs(&self) -> u64 {
        self.recency_secs.clamp(MIN_RECENCY_SECS, MAX_RECENCY_SECS)
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Watches the parent directory of `path`. Whenever the config file is
/// created or modified, reloads it and sends a `ConfigReloaded` event.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!("Failed to create config watcher: {e}");
            return;
        }
    };

    // Watch the directory so editor-style atomic saves (write + rename) are seen.
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            tracing::warn!("Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        tracing::warn!("Failed to watch config directory {}: {e}", watch_dir.display());
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Failed to reload config: {e:#}"),
            }
        }
    }
}

fn default_capture_interval() -> u64 {
    DEFAULT_CAPTURE_INTERVAL_MS
}

fn default_import_interval() -> u64 {
    DEFAULT_IMPORT_INTERVAL_MS
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

fn default_retention() -> u64 {
    DEFAULT_RETENTION_SECS
}

fn default_recency() -> u64 {
    DEFAULT_RECENCY_SECS
}

fn default_auto_start() -> bool {
    true
}
