//! Clipboard-to-file direction.
//!
//! Polls the clipboard and writes every new, non-blank text as an artifact.
//! Each artifact written here is marked self-originated so the import loop
//! never reads it back.
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clipboard;
use crate::session::{SessionState, SyncContext};
use crate::store;

/// Runs the capture loop until `cancel` fires.
pub async fn run(ctx: Arc<SyncContext>, cancel: CancellationToken) {
    let mut ticker = interval(ctx.config.capture_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tick(&ctx);
            }
        }
    }
    tracing::debug!("Capture loop stopped");
}

/// One poll. Returns the artifact written, if any.
pub fn tick(ctx: &SyncContext) -> Option<PathBuf> {
    let dir = ctx.directory()?;
    let now = ctx.clock.unix_secs();

    // Read, compare and claim under one clipboard guard; an import holds the
    // same guard until its snapshot update, so neither side sees the other
    // half done.
    let text = {
        let mut clipboard = clipboard::lock(&ctx.clipboard);
        let read = clipboard.read_text();
        let mut state = ctx.lock_state();
        let text = match read {
            Ok(text) => {
                if std::mem::take(&mut state.clipboard_unreadable) {
                    tracing::info!("Clipboard readable again");
                }
                text
            }
            Err(e) => {
                // Warn once per outage, not on every tick.
                if std::mem::replace(&mut state.clipboard_unreadable, true) {
                    tracing::debug!("Clipboard read failed: {e:#}");
                } else {
                    tracing::warn!("Clipboard read failed: {e:#}");
                }
                return None;
            }
        };
        if text.trim().is_empty() || state.snapshot == text {
            return None;
        }
        claim(&mut state, &dir, now, &text);
        text
    };

    match write_claimed(ctx, &dir, now, &text) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "Saved clipboard text");
            Some(path)
        }
        Err(e) => {
            tracing::warn!("{e:#}");
            None
        }
    }
}

/// Writes `text` as a new artifact in `dir`.
///
/// The snapshot is updated and the path marked self-originated before the
/// file exists, so the import loop can never observe an unmarked artifact of
/// ours. A failed write still consumes the snapshot; the same text is not
/// retried on every tick. Callers that read `text` from the clipboard hold
/// the clipboard guard across this call.
pub fn save_text(ctx: &SyncContext, dir: &Path, text: &str) -> Result<PathBuf> {
    let now = ctx.clock.unix_secs();
    claim(&mut ctx.lock_state(), dir, now, text);
    write_claimed(ctx, dir, now, text)
}

fn claim(state: &mut SessionState, dir: &Path, now: u64, text: &str) {
    state.self_originated.mark(store::artifact_path(dir, now), now);
    state.snapshot = text.to_string();
}

fn write_claimed(ctx: &SyncContext, dir: &Path, now: u64, text: &str) -> Result<PathBuf> {
    let path = store::write_artifact(dir, now, text)?;
    ctx.lock_state().last_saved = Some(path.clone());
    Ok(path)
}
