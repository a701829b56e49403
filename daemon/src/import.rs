//! File-to-clipboard direction.
//!
//! Polls the target directory for artifacts this session did not write and
//! pushes recent ones into the clipboard. Every artifact inside the recency
//! window is examined once; afterwards it sits in the self-originated set
//! until it ages out of the window.
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clipboard;
use crate::session::SyncContext;
use crate::store::{self, Artifact};

/// Runs the import loop until `cancel` fires.
pub async fn run(ctx: Arc<SyncContext>, cancel: CancellationToken) {
    let mut ticker = interval(ctx.config.import_interval());
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
    tracing::debug!("Import loop stopped");
}

/// One poll. Returns the artifacts whose content was pushed to the clipboard,
/// oldest first; the last one is what the clipboard holds afterwards.
pub fn tick(ctx: &SyncContext) -> Vec<PathBuf> {
    let Some(dir) = ctx.directory() else {
        return Vec::new();
    };
    let now = ctx.clock.unix_secs();
    let recency = ctx.config.recency_secs();

    {
        let mut state = ctx.lock_state();
        let evicted = state.self_originated.evict_older_than(now, recency);
        if evicted > 0 {
            tracing::trace!(
                remaining = state.self_originated.len(),
                "Forgot {evicted} aged-out artifacts"
            );
        }
    }

    let artifacts = match store::list_artifacts(&dir) {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!("{e:#}");
            return Vec::new();
        }
    };

    let mut imported = Vec::new();
    for artifact in artifacts {
        if ctx.lock_state().self_originated.contains(&artifact.path) {
            continue;
        }
        if artifact.age_secs(now) > recency {
            continue;
        }
        if examine(ctx, &artifact, now) {
            imported.push(artifact.path);
        }
    }
    imported
}

/// Marks `artifact` as examined and imports it if its text is new.
fn examine(ctx: &SyncContext, artifact: &Artifact, now: u64) -> bool {
    ctx.lock_state()
        .self_originated
        .mark(artifact.path.clone(), artifact.timestamp.max(now));

    let body = match store::read_artifact(&artifact.path) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("{e:#}");
            return false;
        }
    };

    // Held until the snapshot is updated, so a capture tick never compares
    // the pushed text against the old snapshot.
    let mut clipboard = clipboard::lock(&ctx.clipboard);
    if body.is_empty() || ctx.lock_state().snapshot == body {
        tracing::debug!(path = %artifact.path.display(), "Nothing new to import");
        return false;
    }

    if let Err(e) = clipboard.write_text(&body) {
        tracing::warn!(path = %artifact.path.display(), "Import failed: {e:#}");
        return false;
    }

    let mut state = ctx.lock_state();
    state.snapshot = body;
    state.last_imported = Some(artifact.path.clone());
    tracing::info!(path = %artifact.path.display(), "Imported artifact into clipboard");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::clock::ManualClock;
    use crate::config::MonitorConfig;
    use crate::session::SessionState;
    use std::path::Path;
    use std::time::Duration;

    const NOW: u64 = 10_000;

    fn setup(dir: &Path, snapshot: &str) -> (SyncContext, MemoryClipboard, Arc<ManualClock>) {
        let fake = MemoryClipboard::with_text(snapshot);
        let clock = Arc::new(ManualClock::at(NOW));
        let ctx = SyncContext::new(
            SessionState {
                directory: dir.to_path_buf(),
                snapshot: snapshot.to_string(),
                ..SessionState::default()
            },
            clipboard::shared(fake.clone()),
            clock.clone(),
            MonitorConfig::default(),
        );
        (ctx, fake, clock)
    }

    #[test]
    fn recent_external_artifact_is_imported_once() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, clock) = setup(dir.path(), "hello");
        let path = store::write_artifact(dir.path(), NOW - 5, "world").unwrap();

        assert_eq!(tick(&ctx), vec![path.clone()]);
        assert_eq!(fake.get(), "world");
        assert_eq!(ctx.lock_state().snapshot, "world");
        assert_eq!(ctx.lock_state().last_imported.as_deref(), Some(path.as_path()));

        // The user copies something else; the artifact must not win it back.
        fake.set("typed later");
        clock.advance(Duration::from_secs(1));
        assert!(tick(&ctx).is_empty());
        assert_eq!(fake.writes(), vec!["world".to_string()]);
    }

    #[test]
    fn self_originated_artifact_is_never_imported() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, _clock) = setup(dir.path(), "current");
        let path = store::write_artifact(dir.path(), NOW, "mine").unwrap();
        ctx.lock_state().self_originated.mark(path, NOW);

        assert!(tick(&ctx).is_empty());
        assert!(fake.writes().is_empty());
    }

    #[test]
    fn artifact_outside_recency_window_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, _clock) = setup(dir.path(), "current");
        store::write_artifact(dir.path(), NOW - 181, "stale").unwrap();
        let edge = store::write_artifact(dir.path(), NOW - 180, "edge").unwrap();

        assert_eq!(tick(&ctx), vec![edge]);
        assert_eq!(fake.writes(), vec!["edge".to_string()]);
    }

    #[test]
    fn content_matching_snapshot_is_marked_but_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, _clock) = setup(dir.path(), "same");
        let path = store::write_artifact(dir.path(), NOW, "same").unwrap();

        assert!(tick(&ctx).is_empty());
        assert!(fake.writes().is_empty());
        assert!(ctx.lock_state().self_originated.contains(&path));
    }

    #[test]
    fn empty_artifact_is_not_imported() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, _clock) = setup(dir.path(), "current");
        store::write_artifact(dir.path(), NOW, "").unwrap();

        assert!(tick(&ctx).is_empty());
        assert_eq!(fake.get(), "current");
        assert!(fake.writes().is_empty());
    }

    #[test]
    fn whitespace_only_artifact_is_imported() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, _clock) = setup(dir.path(), "hello");
        let path = store::write_artifact(dir.path(), NOW - 1, "  \n").unwrap();

        assert_eq!(tick(&ctx), vec![path]);
        assert_eq!(fake.get(), "  \n");
        assert_eq!(ctx.lock_state().snapshot, "  \n");
    }

    #[test]
    fn several_new_artifacts_leave_the_newest_on_the_clipboard() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, _clock) = setup(dir.path(), "");
        store::write_artifact(dir.path(), NOW - 2, "older").unwrap();
        store::write_artifact(dir.path(), NOW - 1, "newer").unwrap();

        assert_eq!(tick(&ctx).len(), 2);
        assert_eq!(fake.get(), "newer");
    }

    #[test]
    fn clipboard_write_failure_does_not_update_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, _clock) = setup(dir.path(), "before");
        let path = store::write_artifact(dir.path(), NOW, "after").unwrap();
        fake.set_failing(true);

        assert!(tick(&ctx).is_empty());
        assert_eq!(ctx.lock_state().snapshot, "before");
        // Examined once; not retried on the next tick.
        assert!(ctx.lock_state().self_originated.contains(&path));
    }

    #[test]
    fn unreadable_artifact_is_skipped_without_blocking_others() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, _clock) = setup(dir.path(), "");
        let bad = store::write_artifact(dir.path(), NOW - 1, "x").unwrap();
        std::fs::write(&bad, [0xff, 0xfe, 0xfd]).unwrap();
        store::write_artifact(dir.path(), NOW, "good").unwrap();

        assert_eq!(tick(&ctx).len(), 1);
        assert_eq!(fake.get(), "good");
    }

    #[test]
    fn aged_entries_are_evicted_from_the_set() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _fake, clock) = setup(dir.path(), "");
        let path = store::write_artifact(dir.path(), NOW, "x").unwrap();
        tick(&ctx);
        assert_eq!(ctx.lock_state().self_originated.len(), 1);

        clock.advance(Duration::from_secs(181));
        assert!(tick(&ctx).is_empty());
        assert_eq!(ctx.lock_state().self_originated.len(), 0);
        assert!(path.exists());
    }

    #[test]
    fn concurrent_capture_never_echoes_imported_text() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let (ctx, fake, clock) = setup(dir.path(), "");
        let ctx = Arc::new(ctx);
        let done = Arc::new(AtomicBool::new(false));

        let capture = {
            let ctx = Arc::clone(&ctx);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut echoes = Vec::new();
                while !done.load(Ordering::SeqCst) {
                    echoes.extend(crate::capture::tick(&ctx));
                }
                echoes
            })
        };

        // External artifacts land on odd seconds; anything capture writes
        // would land on an even one.
        for i in 0..200 {
            clock.advance(Duration::from_secs(2));
            let now = ctx.clock.unix_secs();
            store::write_artifact(dir.path(), now - 1, &format!("external {i}")).unwrap();
            assert_eq!(tick(&ctx).len(), 1);
        }
        done.store(true, Ordering::SeqCst);
        let echoes = capture.join().unwrap();

        assert!(echoes.is_empty(), "imported text was written back: {echoes:?}");
        assert_eq!(fake.get(), "external 199");
        assert_eq!(store::list_artifacts(dir.path()).unwrap().len(), 200);
    }

    #[test]
    fn missing_directory_is_logged_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _fake, _clock) = setup(&dir.path().join("gone"), "");
        assert!(tick(&ctx).is_empty());
    }
}
