//! Canonical file paths for ClipMirror data files.
//!
//! All files live under `<config dir>/ClipMirror/`:
//!   - config.toml    Optional, read (and watched) by the daemon.
//!   - status.toml    Written by the daemon on every state change.
//!   - settings.toml  Saved target directory, on platforms without a registry.
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "ClipMirror";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";
#[cfg_attr(windows, allow(dead_code))]
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Returns the ClipMirror application directory, e.g. `%APPDATA%\ClipMirror`
/// on Windows or `~/.config/ClipMirror` on Linux.
pub fn app_data_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .ok_or_else(|| anyhow!("Could not determine the user config directory"))
}

pub fn config_file_path(app_dir: &Path) -> PathBuf {
    app_dir.join(CONFIG_FILE_NAME)
}

pub fn status_file_path(app_dir: &Path) -> PathBuf {
    app_dir.join(STATUS_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_paths_share_the_app_dir() {
        let app_dir = PathBuf::from("/home/u/.config/ClipMirror");
        assert_eq!(config_file_path(&app_dir).parent(), Some(app_dir.as_path()));
        assert_eq!(status_file_path(&app_dir).parent(), Some(app_dir.as_path()));
    }

    #[test]
    fn file_paths_have_expected_names() {
        let app_dir = PathBuf::from("base");
        assert_eq!(config_file_path(&app_dir).file_name().unwrap(), CONFIG_FILE_NAME);
        assert_eq!(status_file_path(&app_dir).file_name().unwrap(), STATUS_FILE_NAME);
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        // Headless CI boxes may have no config dir at all.
        if let Ok(dir) = app_data_dir() {
            assert_eq!(dir.file_name().unwrap(), APP_DIR_NAME);
        }
    }
}
