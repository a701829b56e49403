//! Persistence of the selected target directory across restarts.
//!
//! On Windows the path lives in the per-user registry under
//! `HKCU\Software\ClipMirror`, value `SaveDirectory`. Elsewhere it is kept in
//! `settings.toml` next to the config file.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read/write access to the persisted directory.
pub trait DirectoryStore: Send {
    /// Returns the saved directory, or `None` if nothing (or an empty value)
    /// has been saved.
    fn load(&self) -> Result<Option<PathBuf>>;

    fn save(&self, directory: &Path) -> Result<()>;
}

/// Picks the store native to the current platform.
pub fn platform_store(app_dir: &Path) -> Box<dyn DirectoryStore> {
    #[cfg(windows)]
    {
        let _ = app_dir;
        Box::new(RegistryDirectoryStore)
    }
    #[cfg(not(windows))]
    {
        Box::new(FileDirectoryStore::new(app_dir.join(crate::paths::SETTINGS_FILE_NAME)))
    }
}

// ── File-backed store ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    save_directory: Option<String>,
}

/// Stores the directory in a small TOML file.
pub struct FileDirectoryStore {
    path: PathBuf,
}

impl FileDirectoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DirectoryStore for FileDirectoryStore {
    fn load(&self) -> Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file: {}", self.path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", self.path.display()))?;
        Ok(settings
            .save_directory
            .filter(|d| !d.is_empty())
            .map(PathBuf::from))
    }

    fn save(&self, directory: &Path) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let settings = Settings {
            save_directory: Some(directory.to_string_lossy().into_owned()),
        };
        let content = toml::to_string_pretty(&settings).context("Failed to serialize settings")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings file: {}", self.path.display()))
    }
}

// ── Windows registry store ────────────────────────────────────────────────────

#[cfg(windows)]
pub struct RegistryDirectoryStore;

#[cfg(windows)]
impl DirectoryStore for RegistryDirectoryStore {
    fn load(&self) -> Result<Option<PathBuf>> {
        Ok(imp::read()?.filter(|d| !d.is_empty()).map(PathBuf::from))
    }

    fn save(&self, directory: &Path) -> Result<()> {
        imp::write(&directory.to_string_lossy())
    }
}

#[cfg(windows)]
mod imp {
    use anyhow::{bail, Result};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS};
    use windows::Win32::System::Registry::{
        RegCloseKey, RegCreateKeyExW, RegGetValueW, RegSetValueExW, HKEY, HKEY_CURRENT_USER,
        KEY_SET_VALUE, REG_OPTION_NON_VOLATILE, REG_SZ, RRF_RT_REG_SZ,
    };

    const SETTINGS_KEY: &str = r"Software\ClipMirror";
    const VALUE_NAME: &str = "SaveDirectory";

    /// Converts a Rust `&str` to a null-terminated UTF-16 `Vec<u16>`.
    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Reads `HKCU\Software\ClipMirror\SaveDirectory`. A missing key or value
    /// is `None`.
    pub fn read() -> Result<Option<String>> {
        let key_w = to_wide(SETTINGS_KEY);
        let val_w = to_wide(VALUE_NAME);

        // First call sizes the buffer (in bytes, terminator included).
        let mut size: u32 = 0;
        let err = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(key_w.as_ptr()),
                PCWSTR::from_raw(val_w.as_ptr()),
                RRF_RT_REG_SZ,
                None,
                None,
                Some(&mut size),
            )
        };
        if err == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if err != ERROR_SUCCESS {
            bail!("RegGetValueW failed: {:?}", err);
        }

        let mut buf = vec![0u16; (size as usize).div_ceil(2)];
        let err = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(key_w.as_ptr()),
                PCWSTR::from_raw(val_w.as_ptr()),
                RRF_RT_REG_SZ,
                None,
                Some(buf.as_mut_ptr().cast()),
                Some(&mut size),
            )
        };
        if err != ERROR_SUCCESS {
            bail!("RegGetValueW failed: {:?}", err);
        }

        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        Ok(Some(String::from_utf16_lossy(&buf[..len])))
    }

    /// Writes `value` to `HKCU\Software\ClipMirror\SaveDirectory`, creating
    /// the key if needed.
    pub fn write(value: &str) -> Result<()> {
        let key_w = to_wide(SETTINGS_KEY);
        let val_w = to_wide(VALUE_NAME);
        let data_w = to_wide(value);
        let data_bytes: &[u8] = unsafe {
            std::slice::from_raw_parts(data_w.as_ptr() as *const u8, data_w.len() * 2)
        };

        let mut hkey = HKEY::default();
        let err = unsafe {
            RegCreateKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(key_w.as_ptr()),
                0,
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_SET_VALUE,
                None,
                &mut hkey,
                None,
            )
        };
        if err != ERROR_SUCCESS {
            bail!("RegCreateKeyExW failed: {:?}", err);
        }

        let err = unsafe {
            RegSetValueExW(
                hkey,
                PCWSTR::from_raw(val_w.as_ptr()),
                0,
                REG_SZ,
                Some(data_bytes),
            )
        };
        unsafe { let _ = RegCloseKey(hkey); };

        if err != ERROR_SUCCESS {
            bail!("RegSetValueExW failed: {:?}", err);
        }
        Ok(())
    }
}
