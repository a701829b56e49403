//! Stopped/Monitoring state machine plus the one-shot commands around it.
//!
//! The controller owns the target directory, the clipboard snapshot and
//! self-originated set carried from one session to the next, and at most one
//! running [`Session`]. Every user-facing command returns either a
//! notification to show or a [`ControlError`] explaining why it was refused.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture;
use crate::clipboard::{self, SharedClipboard};
use crate::clock::Clock;
use crate::config::Config;
use crate::session::{SelfOriginated, Session, SessionState, SyncContext};
use crate::settings::DirectoryStore;
use crate::status::{DaemonState, DaemonStatus};
use crate::store;

/// Why a command was refused.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("please select a save directory first")]
    NoDirectory,
    #[error("{} is not an existing directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("the clipboard holds no text to save")]
    EmptyClipboard,
    #[error("could not read the clipboard: {0:#}")]
    Clipboard(anyhow::Error),
    #[error("save failed: {0:#}")]
    Save(anyhow::Error),
}

pub struct Controller {
    directory: Option<PathBuf>,
    /// Clipboard text last seen; handed to each new session and taken back
    /// when it stops.
    snapshot: String,
    /// Lives for the whole process run so a restarted session never imports
    /// what an earlier one wrote.
    self_originated: SelfOriginated,
    session: Option<Session>,
    clipboard: SharedClipboard,
    clock: Arc<dyn Clock>,
    config: Config,
    store: Box<dyn DirectoryStore>,
    status: DaemonStatus,
}

impl Controller {
    /// Restores the persisted directory and captures the clipboard as the
    /// initial snapshot. Starts in [`DaemonState::Stopped`].
    pub fn new(
        clipboard: SharedClipboard,
        clock: Arc<dyn Clock>,
        config: Config,
        store: Box<dyn DirectoryStore>,
    ) -> Self {
        let directory = match store.load() {
            Ok(dir) => dir,
            Err(e) => {
                tracing::error!("Failed to load saved directory: {e:#}");
                None
            }
        };
        let snapshot = clipboard::read_shared(&clipboard).unwrap_or_else(|e| {
            tracing::debug!("Initial clipboard read failed: {e:#}");
            String::new()
        });

        let mut controller = Self {
            directory,
            snapshot,
            self_originated: SelfOriginated::default(),
            session: None,
            clipboard,
            clock,
            config,
            store,
            status: DaemonStatus::new(),
        };
        controller.refresh_status();
        controller
    }

    pub fn state(&self) -> DaemonState {
        if self.session.is_some() {
            DaemonState::Monitoring
        } else {
            DaemonState::Stopped
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// True when monitoring should begin without an explicit start command.
    pub fn should_auto_start(&self) -> bool {
        self.config.monitor.auto_start && self.directory.is_some()
    }

    /// Current status, refreshed from the running session.
    pub fn status(&mut self) -> &DaemonStatus {
        self.refresh_status();
        &self.status
    }

    /// Sets and persists the target directory. A running session switches to
    /// it from its next tick on.
    pub fn select_directory(&mut self, path: PathBuf) -> Result<String, ControlError> {
        if path.as_os_str().is_empty() {
            return Err(self.refuse(ControlError::NoDirectory));
        }
        let path = if path.is_relative() {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path,
            }
        } else {
            path
        };
        if !path.is_dir() {
            return Err(self.refuse(ControlError::NotADirectory(path)));
        }

        if let Err(e) = self.store.save(&path) {
            tracing::warn!("Failed to persist directory: {e:#}");
        }
        if let Some(session) = &self.session {
            session.set_directory(path.clone());
        }
        let message = format!("Save directory: {}", path.display());
        self.directory = Some(path);
        self.status.error = None;
        self.touch();
        Ok(message)
    }

    /// Stopped → Monitoring. Refused without a usable directory.
    pub fn start(&mut self) -> Result<String, ControlError> {
        if self.session.is_some() {
            return Ok(format!("Status: {}", DaemonState::Monitoring.label()));
        }
        let dir = self.usable_directory()?;

        let context = SyncContext::new(
            SessionState {
                directory: dir,
                snapshot: self.snapshot.clone(),
                self_originated: std::mem::take(&mut self.self_originated),
                ..SessionState::default()
            },
            Arc::clone(&self.clipboard),
            Arc::clone(&self.clock),
            self.config.monitor.clone(),
        );
        self.session = Some(Session::start(context));
        self.status.error = None;
        self.touch();
        Ok(format!("Status: {}", DaemonState::Monitoring.label()))
    }

    /// Monitoring → Stopped. Waits for the loops to exit.
    pub async fn stop(&mut self) -> String {
        if let Some(session) = self.session.take() {
            let state = session.stop().await;
            absorb(&mut self.status, &state);
            self.snapshot = state.snapshot;
            self.self_originated = state.self_originated;
            self.touch();
        }
        format!("Status: {}", DaemonState::Stopped.label())
    }

    pub async fn toggle(&mut self) -> Result<String, ControlError> {
        match self.state() {
            DaemonState::Monitoring => Ok(self.stop().await),
            DaemonState::Stopped => self.start(),
        }
    }

    /// Writes the current clipboard text to a new artifact, whether or not
    /// monitoring is running.
    pub fn save_now(&mut self) -> Result<String, ControlError> {
        let dir = self.usable_directory()?;
        // Held until the snapshot is claimed, as in the capture loop.
        let handle = Arc::clone(&self.clipboard);
        let mut guard = clipboard::lock(&handle);
        let text = match guard.read_text() {
            Ok(text) => text,
            Err(e) => return Err(self.refuse(ControlError::Clipboard(e))),
        };
        if text.trim().is_empty() {
            return Err(self.refuse(ControlError::EmptyClipboard));
        }

        let written = match &self.session {
            // Marks the artifact and moves the snapshot so capture does not
            // write the same text again.
            Some(session) => capture::save_text(session.context(), &dir, &text),
            None => {
                let now = self.clock.unix_secs();
                store::write_artifact(&dir, now, &text).map(|path| {
                    self.self_originated.mark(path.clone(), now);
                    self.snapshot = text;
                    path
                })
            }
        };
        drop(guard);
        match written {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Saved clipboard on request");
                self.status.last_saved_path = Some(path.to_string_lossy().into_owned());
                self.status.error = None;
                self.touch();
                Ok(format!("Saved to: {}", path.display()))
            }
            Err(e) => Err(self.refuse(ControlError::Save(e))),
        }
    }

    /// Replaces the config. Timing changes apply from the next start.
    pub fn reload_config(&mut self, config: Config) -> String {
        let changed = config != self.config;
        self.config = config;
        match (changed, self.state()) {
            (false, _) => "Config reloaded (no changes)".to_string(),
            (true, DaemonState::Monitoring) => {
                "Config reloaded; new timings apply after the next start".to_string()
            }
            (true, DaemonState::Stopped) => "Config reloaded".to_string(),
        }
    }

    /// Stops monitoring if needed; called once before the process exits.
    pub async fn shutdown(&mut self) {
        if self.session.is_some() {
            self.stop().await;
        }
    }

    fn usable_directory(&mut self) -> Result<PathBuf, ControlError> {
        match self.directory.clone() {
            None => Err(self.refuse(ControlError::NoDirectory)),
            Some(dir) if !dir.is_dir() => Err(self.refuse(ControlError::NotADirectory(dir))),
            Some(dir) => Ok(dir),
        }
    }

    fn refuse(&mut self, error: ControlError) -> ControlError {
        tracing::debug!("Command refused: {error}");
        self.status.error = Some(error.to_string());
        self.touch();
        error
    }

    fn refresh_status(&mut self) {
        self.status.state = self.state();
        self.status.directory = self
            .directory
            .as_ref()
            .map(|d| d.to_string_lossy().into_owned());
        if let Some(session) = &self.session {
            absorb(&mut self.status, &session.context().lock_state());
        }
    }

    fn touch(&mut self) {
        self.refresh_status();
        self.status.touch();
    }
}

/// Copies the last saved/imported artifact paths of a session into `status`.
fn absorb(status: &mut DaemonStatus, state: &SessionState) {
    if let Some(path) = &state.last_saved {
        status.last_saved_path = Some(path.to_string_lossy().into_owned());
    }
    if let Some(path) = &state.last_imported {
        status.last_imported_path = Some(path.to_string_lossy().into_owned());
    }
}
