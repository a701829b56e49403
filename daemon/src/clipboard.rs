//! Plain-text clipboard access.
//!
//! Only text is mirrored; anything else on the clipboard (images, file lists)
//! reads as an empty string, which every caller treats as "nothing to do".
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// Platform-agnostic clipboard access.
pub trait ClipboardAccess: Send {
    /// Returns the current clipboard text, or an empty string when the
    /// clipboard holds no text.
    fn read_text(&mut self) -> Result<String>;

    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Clipboard handle shared by the controller and the sync loops.
pub type SharedClipboard = Arc<Mutex<Box<dyn ClipboardAccess>>>;

pub fn shared(clipboard: impl ClipboardAccess + 'static) -> SharedClipboard {
    Arc::new(Mutex::new(Box::new(clipboard)))
}

/// Locks the shared clipboard, recovering a poisoned lock.
///
/// Code that compares clipboard text against the session snapshot holds this
/// guard until the snapshot is updated. The clipboard is always locked before
/// the session state, never after.
pub fn lock(clipboard: &SharedClipboard) -> MutexGuard<'_, Box<dyn ClipboardAccess>> {
    clipboard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn read_shared(clipboard: &SharedClipboard) -> Result<String> {
    lock(clipboard).read_text()
}

// ── Native clipboard ──────────────────────────────────────────────────────────

/// OS clipboard backed by `arboard`.
pub struct NativeClipboard {
    clipboard: arboard::Clipboard,
}

impl NativeClipboard {
    pub fn new() -> Result<Self> {
        let clipboard =
            arboard::Clipboard::new().map_err(|e| anyhow!("failed to open clipboard: {e}"))?;
        Ok(Self { clipboard })
    }
}

impl ClipboardAccess for NativeClipboard {
    fn read_text(&mut self) -> Result<String> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(text),
            // Empty clipboard, or a non-text format.
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(anyhow!("failed to read clipboard: {e}")),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.clipboard
            .set_text(text.to_owned())
            .map_err(|e| anyhow!("failed to write clipboard: {e}"))
    }
}

// ── Unavailable clipboard ─────────────────────────────────────────────────────

/// Stand-in used when the OS clipboard could not be opened at startup (no
/// display server, for instance). Every access fails with the original reason
/// so the loops log it and keep going.
pub struct UnavailableClipboard {
    reason: String,
}

impl UnavailableClipboard {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl ClipboardAccess for UnavailableClipboard {
    fn read_text(&mut self) -> Result<String> {
        Err(anyhow!("clipboard unavailable: {}", self.reason))
    }

    fn write_text(&mut self, _text: &str) -> Result<()> {
        Err(anyhow!("clipboard unavailable: {}", self.reason))
    }
}

/// Opens the native clipboard, falling back to [`UnavailableClipboard`].
pub fn open() -> SharedClipboard {
    match NativeClipboard::new() {
        Ok(native) => shared(native),
        Err(e) => {
            tracing::error!("{e:#}; clipboard sync will not work until restart");
            shared(UnavailableClipboard::new(e.to_string()))
        }
    }
}

// ── In-memory clipboard ───────────────────────────────────────────────────────

#[cfg(test)]
pub use memory::MemoryClipboard;
