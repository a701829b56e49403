//! Expiry sweep: deletes artifacts older than the retention window, whoever
//! wrote them.
use std::path::Path;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::session::SyncContext;
use crate::store::{self, Entry};

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub kept: usize,
    /// Names that carry the artifact prefix and suffix but no valid timestamp.
    pub malformed: usize,
    pub failed: usize,
}

/// Runs the sweep loop until `cancel` fires. The first sweep happens
/// immediately.
pub async fn run(ctx: Arc<SyncContext>, cancel: CancellationToken) {
    let mut ticker = interval(ctx.config.sweep_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Some(dir) = ctx.directory() {
                    let report = sweep(&dir, ctx.clock.unix_secs(), ctx.config.retention_secs());
                    if report.removed > 0 || report.failed > 0 {
                        tracing::info!(
                            removed = report.removed,
                            kept = report.kept,
                            failed = report.failed,
                            "Expired artifacts swept"
                        );
                    }
                }
            }
        }
    }
    tracing::debug!("Sweep loop stopped");
}

/// Deletes every artifact in `dir` whose age exceeds `retention_secs`.
pub fn sweep(dir: &Path, now_secs: u64, retention_secs: u64) -> SweepReport {
    let mut report = SweepReport::default();

    let entries = match store::scan(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("{e:#}");
            return report;
        }
    };

    for entry in entries {
        match entry {
            Entry::Malformed(path) => {
                tracing::debug!(path = %path.display(), "Skipping artifact with unparseable timestamp");
                report.malformed += 1;
            }
            Entry::Artifact(artifact) if artifact.age_secs(now_secs) > retention_secs => {
                match store::remove_artifact(&artifact.path) {
                    Ok(()) => {
                        tracing::debug!(path = %artifact.path.display(), "Deleted expired artifact");
                        report.removed += 1;
                    }
                    Err(e) => {
                        tracing::warn!("{e:#}");
                        report.failed += 1;
                    }
                }
            }
            Entry::Artifact(_) => report.kept += 1,
        }
    }
    report
}
