//! Live progress of a batch.
//!
//! All counters live in one `ProgressSnapshot` behind a `watch` channel, so an
//! update is applied as a whole and readers never see half of it.

use crate::upload::types::UploadOutcome;
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub attempts: u64,
}

impl ProgressSnapshot {
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }

    pub fn status_text(&self) -> String {
        format!(
            "Progress: {}/{} files | ✅ Success: {} | ⏩ Skipped: {} | ❌ Failed: {}",
            self.completed, self.total, self.successful, self.skipped, self.failed
        )
    }
}

#[derive(Debug)]
pub struct ProgressTracker {
    state: watch::Sender<ProgressSnapshot>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ProgressSnapshot::default());
        Self { state }
    }

    /// Resets the counters for a batch of `total` uploads.
    pub fn begin(&self, total: usize, total_bytes: u64, skipped: usize) {
        self.state.send_replace(ProgressSnapshot {
            total,
            total_bytes,
            skipped,
            ..ProgressSnapshot::default()
        });
    }

    pub fn record_attempt_start(&self) {
        self.state.send_modify(|snapshot| snapshot.attempts += 1);
    }

    pub fn record_completion(&self, outcome: &UploadOutcome, bytes: u64) {
        self.state.send_modify(|snapshot| {
            snapshot.completed += 1;
            if outcome.is_success() {
                snapshot.successful += 1;
                snapshot.uploaded_bytes += bytes;
            } else {
                snapshot.failed += 1;
            }
        });
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.state.borrow()
    }

    /// Receiver that is notified after every update.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.state.subscribe()
    }
}
