use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug, PartialEq)]
pub enum DaemonEvent {
    /// The user picked a new target directory.
    DirectorySelected(PathBuf),
    StartMonitoring,
    StopMonitoring,
    /// Start if stopped, stop if monitoring.
    ToggleMonitoring,
    /// Write the current clipboard text to a new artifact right now.
    SaveNow,
    /// Print the current status line.
    StatusRequested,
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Quit command, end of input, or Ctrl+C; stop monitoring and exit.
    Shutdown,
}
