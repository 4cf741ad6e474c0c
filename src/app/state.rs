use crate::upload::{FileStatus, ProgressSnapshot, UploadStatus};
use std::path::PathBuf;

/// Console-side view of a running batch, rebuilt from status events and
/// progress snapshots.
#[derive(Debug, Default)]
pub struct UploadState {
    pub progress: ProgressSnapshot,
    pub current_file: Option<PathBuf>,
    pub file_statuses: Vec<FileStatus>,
    pub retries: usize,
    pub is_uploading: bool,
    /// Set once the batch size has been printed.
    pub announced: bool,
}

impl UploadState {
    pub fn clear(&mut self) {
        *self = UploadState::default();
    }

    pub fn apply(&mut self, status: &FileStatus) {
        match &status.status {
            UploadStatus::Processing { .. } => {
                self.current_file = Some(status.path.clone());
            }
            UploadStatus::Retrying { .. } => self.retries += 1,
            UploadStatus::Success(_)
            | UploadStatus::Error(_)
            | UploadStatus::Skipped(_)
            | UploadStatus::Cancelled => {
                self.file_statuses.push(status.clone());
            }
        }
    }

    pub fn update_progress(&mut self, progress: ProgressSnapshot) {
        self.progress = progress;
    }

    pub fn get_progress_percentage(&self) -> f32 {
        self.progress.percentage()
    }

    pub fn get_status_text(&self) -> String {
        if self.is_uploading {
            format!("{} | 🔁 Retries: {}", self.progress.status_text(), self.retries)
        } else {
            format!("Final Status: {}", self.progress.status_text())
        }
    }

    pub fn failed_statuses(&self) -> impl Iterator<Item = &FileStatus> {
        self.file_statuses
            .iter()
            .filter(|status| matches!(status.status, UploadStatus::Error(_)))
    }
}
