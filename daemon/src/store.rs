//! Content store: clipboard text kept as plain files in the target directory.
//!
//! Every artifact is named `clipboard_<unix_seconds>.txt` and holds the raw
//! UTF-8 text, with no header. The timestamp in the name is the artifact's
//! canonical creation time; both the import recency check and the expiry
//! sweep measure age from it.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const ARTIFACT_PREFIX: &str = "clipboard_";
pub const ARTIFACT_SUFFIX: &str = ".txt";

/// A well-formed artifact found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    /// Seconds since the Unix epoch, parsed from the file name.
    pub timestamp: u64,
}

impl Artifact {
    /// Age relative to `now_secs`. Names stamped in the future count as age 0.
    pub fn age_secs(&self, now_secs: u64) -> u64 {
        now_secs.saturating_sub(self.timestamp)
    }
}

/// A file that carries the artifact prefix and suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Artifact(Artifact),
    /// Prefix and suffix match but the timestamp between them does not parse.
    Malformed(PathBuf),
}

/// Returns the file name for an artifact created at `unix_secs`.
pub fn artifact_file_name(unix_secs: u64) -> String {
    format!("{ARTIFACT_PREFIX}{unix_secs}{ARTIFACT_SUFFIX}")
}

/// Parses the timestamp out of an artifact file name.
///
/// Accepts only `clipboard_<digits>.txt`; signs, whitespace and overflow are
/// rejected.
pub fn parse_timestamp(file_name: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn looks_like_artifact(file_name: &str) -> bool {
    file_name.len() >= ARTIFACT_PREFIX.len() + ARTIFACT_SUFFIX.len()
        && file_name.starts_with(ARTIFACT_PREFIX)
        && file_name.ends_with(ARTIFACT_SUFFIX)
}

/// Lists every regular file in `dir` that carries the artifact prefix and
/// suffix, well-formed or not. Order is unspecified.
pub fn scan(dir: &Path) -> Result<Vec<Entry>> {
    let read_dir = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory: {}", dir.display()))?;

    let mut entries = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = match dir_entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        let file_name = dir_entry.file_name();
        let Some(name) = file_name.to_str() else { continue };
        if !looks_like_artifact(name) {
            continue;
        }
        if !dir_entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = dir_entry.path();
        entries.push(match parse_timestamp(name) {
            Some(timestamp) => Entry::Artifact(Artifact { path, timestamp }),
            None => Entry::Malformed(path),
        });
    }
    Ok(entries)
}

/// Lists the well-formed artifacts in `dir`, oldest first.
pub fn list_artifacts(dir: &Path) -> Result<Vec<Artifact>> {
    let mut artifacts: Vec<Artifact> = scan(dir)?
        .into_iter()
        .filter_map(|entry| match entry {
            Entry::Artifact(a) => Some(a),
            Entry::Malformed(_) => None,
        })
        .collect();
    artifacts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));
    Ok(artifacts)
}

pub fn artifact_path(dir: &Path, unix_secs: u64) -> PathBuf {
    dir.join(artifact_file_name(unix_secs))
}

/// Writes `content` as a new artifact stamped `unix_secs` and returns its path.
///
/// Two writes within the same second share a name; the later one wins.
pub fn write_artifact(dir: &Path, unix_secs: u64, content: &str) -> Result<PathBuf> {
    let path = artifact_path(dir, unix_secs);
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn read_artifact(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn remove_artifact(path: &Path) -> Result<()> {
    std::fs::remove_file(path).with_context(|| format!("Failed to delete {}", path.display()))
}
