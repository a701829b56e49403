//! One monitoring session: the state shared by the three sync loops and the
//! tasks that run them.
//!
//! A `Session` is started when the user starts monitoring and consumed by
//! [`Session::stop`]. It owns:
//!   - a clipboard-to-file task ([`crate::capture`])
//!   - a file-to-clipboard task ([`crate::import`])
//!   - an expiry sweep task ([`crate::sweeper`])
//!
//! All mutable state lives in one `Mutex<SessionState>`. Critical sections are
//! short and never span an `.await`.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clipboard::SharedClipboard;
use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::{capture, import, sweeper};

/// Artifacts this process wrote itself or has already examined for import.
///
/// Each entry carries a stamp in Unix seconds. Once an entry is older than the
/// recency window its artifact could not be imported anyway, so it is dropped.
#[derive(Debug, Default)]
pub struct SelfOriginated {
    entries: HashMap<PathBuf, u64>,
}

impl SelfOriginated {
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Records `path` with `stamp`, keeping the later stamp if already present.
    pub fn mark(&mut self, path: PathBuf, stamp: u64) {
        let entry = self.entries.entry(path).or_insert(stamp);
        *entry = (*entry).max(stamp);
    }

    /// Drops entries whose stamp is more than `window_secs` before `now_secs`.
    /// Returns the number of entries removed.
    pub fn evict_older_than(&mut self, now_secs: u64, window_secs: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, stamp| now_secs.saturating_sub(*stamp) <= window_secs);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Mutable state shared by the sync loops.
#[derive(Debug, Default)]
pub struct SessionState {
    pub directory: PathBuf,
    /// Last clipboard text written to or read from an artifact.
    pub snapshot: String,
    pub self_originated: SelfOriginated,
    pub last_saved: Option<PathBuf>,
    pub last_imported: Option<PathBuf>,
    /// Set while clipboard reads keep failing, so the outage is warned once.
    pub clipboard_unreadable: bool,
}

/// Everything a sync loop needs, shared by handle.
pub struct SyncContext {
    pub state: Mutex<SessionState>,
    pub clipboard: SharedClipboard,
    pub clock: Arc<dyn Clock>,
    pub config: MonitorConfig,
}

impl SyncContext {
    pub fn new(
        state: SessionState,
        clipboard: SharedClipboard,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        Self { state: Mutex::new(state), clipboard, clock, config }
    }

    /// Locks the session state, recovering from a poisoned lock.
    pub fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The target directory, or `None` when it is unset.
    pub fn directory(&self) -> Option<PathBuf> {
        let state = self.lock_state();
        if state.directory.as_os_str().is_empty() {
            None
        } else {
            Some(state.directory.clone())
        }
    }
}

/// A running monitoring session.
pub struct Session {
    context: Arc<SyncContext>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Session {
    /// Spawns the three sync loops over `context`. Must be called from
    /// within a tokio runtime.
    pub fn start(context: SyncContext) -> Self {
        let context = Arc::new(context);
        let cancel = CancellationToken::new();

        let handles = vec![
            tokio::spawn(capture::run(Arc::clone(&context), cancel.clone())),
            tokio::spawn(import::run(Arc::clone(&context), cancel.clone())),
            tokio::spawn(sweeper::run(Arc::clone(&context), cancel.clone())),
        ];

        tracing::info!(
            directory = %context.lock_state().directory.display(),
            "Monitoring started"
        );
        Session { context, cancel, handles }
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Points the running loops at a new directory from their next tick on.
    pub fn set_directory(&self, directory: PathBuf) {
        self.context.lock_state().directory = directory;
    }

    /// Cancels all loops, waits for them to exit, and hands back the final
    /// state so the next session can pick up where this one left off.
    pub async fn stop(self) -> SessionState {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!("Sync task ended abnormally: {e}");
            }
        }
        tracing::info!("Monitoring stopped");
        let mut state = self.context.lock_state();
        std::mem::take(&mut *state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{self, MemoryClipboard};
    use crate::clock::ManualClock;
    use crate::store;
    use std::time::Duration;

    // ── SelfOriginated ────────────────────────────────────────────────────────

    #[test]
    fn mark_and_contains() {
        let mut set = SelfOriginated::default();
        set.mark(PathBuf::from("/d/clipboard_1.txt"), 1);
        assert!(set.contains(Path::new("/d/clipboard_1.txt")));
        assert!(!set.contains(Path::new("/d/clipboard_2.txt")));
    }

    #[test]
    fn mark_keeps_later_stamp() {
        let mut set = SelfOriginated::default();
        let path = PathBuf::from("a");
        set.mark(path.clone(), 500);
        set.mark(path.clone(), 100);
        // Still within the window measured from 500.
        assert_eq!(set.evict_older_than(600, 180), 0);
        assert!(set.contains(&path));
    }

    #[test]
    fn eviction_drops_only_entries_past_the_window() {
        let mut set = SelfOriginated::default();
        set.mark(PathBuf::from("old"), 1_000);
        set.mark(PathBuf::from("edge"), 1_020);
        set.mark(PathBuf::from("new"), 1_150);

        let removed = set.evict_older_than(1_200, 180);
        assert_eq!(removed, 1);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(Path::new("old")));
        assert!(set.contains(Path::new("edge")));
        assert!(set.contains(Path::new("new")));
    }

    #[test]
    fn future_stamps_are_never_evicted_early() {
        let mut set = SelfOriginated::default();
        set.mark(PathBuf::from("future"), 10_000);
        assert_eq!(set.evict_older_than(1_000, 180), 0);
    }

    // ── SyncContext ───────────────────────────────────────────────────────────

    fn context_with(dir: PathBuf) -> SyncContext {
        SyncContext::new(
            SessionState { directory: dir, ..SessionState::default() },
            clipboard::shared(MemoryClipboard::default()),
            Arc::new(ManualClock::at(1_000)),
            MonitorConfig::default(),
        )
    }

    #[test]
    fn empty_directory_reads_as_none() {
        assert!(context_with(PathBuf::new()).directory().is_none());
        assert_eq!(
            context_with(PathBuf::from("/tmp/x")).directory(),
            Some(PathBuf::from("/tmp/x"))
        );
    }

    // ── Session lifecycle ─────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn stop_returns_promptly_despite_long_sweep_interval() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::start(context_with(dir.path().to_path_buf()));

        // Let every loop take its first tick.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let stopped = tokio::time::timeout(Duration::from_secs(1), session.stop()).await;
        assert!(stopped.is_ok(), "stop waited for the 600s sweep interval");
    }

    #[tokio::test(start_paused = true)]
    async fn session_captures_and_reports_snapshot_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let fake = MemoryClipboard::with_text("hello");
        let context = SyncContext::new(
            SessionState { directory: dir.path().to_path_buf(), ..SessionState::default() },
            clipboard::shared(fake.clone()),
            Arc::new(ManualClock::at(1_000)),
            MonitorConfig::default(),
        );
        let session = Session::start(context);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let state = session.stop().await;

        assert_eq!(state.snapshot, "hello");
        assert_eq!(state.self_originated.len(), 1);
        let artifacts = store::list_artifacts(dir.path()).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(store::read_artifact(&artifacts[0].path).unwrap(), "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn set_directory_redirects_running_loops() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let fake = MemoryClipboard::with_text("one");
        let clock = Arc::new(ManualClock::at(1_000));
        let session = Session::start(SyncContext::new(
            SessionState { directory: first.path().to_path_buf(), ..SessionState::default() },
            clipboard::shared(fake.clone()),
            clock.clone(),
            MonitorConfig::default(),
        ));

        tokio::time::sleep(Duration::from_millis(600)).await;
        session.set_directory(second.path().to_path_buf());
        clock.advance(Duration::from_secs(1));
        fake.set("two");
        tokio::time::sleep(Duration::from_millis(600)).await;
        session.stop().await;

        assert_eq!(store::list_artifacts(first.path()).unwrap().len(), 1);
        let moved = store::list_artifacts(second.path()).unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(store::read_artifact(&moved[0].path).unwrap(), "two");
    }
}
