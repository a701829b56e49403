use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current operational state of the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// No session is running; clipboard and directory are left alone.
    Stopped,
    /// The capture, import and sweep loops are running.
    Monitoring,
}

impl DaemonState {
    /// Status text shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            DaemonState::Stopped => "stopped",
            DaemonState::Monitoring => "monitoring in progress",
        }
    }
}

/// Runtime status written by the daemon to `<app dir>/status.toml`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    pub state: DaemonState,
    /// Target directory, if one has been selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Most recent artifact written from the clipboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved_path: Option<String>,
    /// Most recent artifact pushed into the clipboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_imported_path: Option<String>,
    /// RFC 3339 timestamp of the last state change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Human-readable message for the last refused or failed action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    /// Constructs the initial stopped status on daemon startup.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Stopped,
            directory: None,
            last_saved_path: None,
            last_imported_path: None,
            updated_at: None,
            error: None,
        }
    }

    /// Stamps `updated_at` with the current local time.
    pub fn touch(&mut self) {
        self.updated_at = Some(chrono::Local::now().to_rfc3339());
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// A status write failure is logged and never interrupts the daemon.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                tracing::warn!("Failed to write status file: {e}");
            }
        }
        Err(e) => tracing::warn!("Failed to serialize status: {e}"),
    }
}
