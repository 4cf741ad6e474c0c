use crate::config::UploadPolicy;
use crate::error::{Error, Result, ValidationError};
use crate::upload::client::UploadClient;
use crate::upload::progress::ProgressTracker;
use crate::upload::report::BatchReport;
use crate::upload::retry::RetryingUploader;
use crate::upload::types::{FileCandidate, FileStatus, UploadOutcome, UploadStatus};
use crate::upload::validator::FileValidator;
use futures::{stream, StreamExt};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Runs one batch: discover, validate, upload with bounded concurrency,
/// and collect every outcome into a `BatchReport`.
///
/// An orchestrator drives exactly one batch. `run_batch` consumes it, so the
/// cancellation token and progress tracker handed out beforehand only ever
/// describe that batch. Build a new orchestrator for the next one; the
/// `UploadClient` can be shared between them.
pub struct BatchOrchestrator {
    client: Arc<dyn UploadClient>,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
    status_sender: Option<UnboundedSender<FileStatus>>,
}

struct Discovery {
    candidates: Vec<FileCandidate>,
    rejected: Vec<(PathBuf, ValidationError)>,
}

impl BatchOrchestrator {
    pub fn new(client: Arc<dyn UploadClient>) -> Self {
        Self {
            client,
            tracker: Arc::new(ProgressTracker::new()),
            cancel: CancellationToken::new(),
            status_sender: None,
        }
    }

    pub fn with_status_sender(mut self, sender: UnboundedSender<FileStatus>) -> Self {
        self.status_sender = Some(sender);
        self
    }

    pub fn tracker(&self) -> Arc<ProgressTracker> {
        self.tracker.clone()
    }

    /// Cancelling this token stops new uploads and abandons running ones.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run_batch(self, root: &Path, policy: &UploadPolicy) -> Result<BatchReport> {
        policy.validate()?;

        let discovery = {
            let root = root.to_path_buf();
            let policy = policy.clone();
            tokio::task::spawn_blocking(move || Self::discover_and_validate(&root, &policy))
                .await??
        };

        let total_bytes = discovery.candidates.iter().map(FileCandidate::size).sum();
        let mut report = BatchReport::new(total_bytes);

        for (path, error) in discovery.rejected.iter().cloned() {
            tracing::info!(path = %path.display(), reason = %error, "skipping file");
            self.send_status(&path, UploadStatus::Skipped(error.to_string()));
            report.record_rejection(path, error);
        }

        let candidates = discovery.candidates;
        tracing::info!(
            files = candidates.len(),
            bytes = total_bytes,
            rejected = discovery.rejected.len(),
            "starting batch"
        );
        self.tracker
            .begin(candidates.len(), total_bytes, discovery.rejected.len());

        let mut uploader = RetryingUploader::new(self.client.clone(), Arc::new(policy.clone()))
            .with_tracker(self.tracker.clone());
        if let Some(sender) = &self.status_sender {
            uploader = uploader.with_status_sender(sender.clone());
        }

        let uploader = &uploader;
        let cancel = &self.cancel;
        let mut outcomes = stream::iter(candidates)
            .map(move |candidate| async move {
                let outcome = uploader.upload_with_retry(&candidate, cancel).await;
                (candidate, outcome)
            })
            .buffer_unordered(policy.max_concurrent_uploads);

        while let Some((candidate, outcome)) = outcomes.next().await {
            self.tracker.record_completion(&outcome, candidate.size());
            let status = match &outcome {
                UploadOutcome::Success { download_url, .. } => {
                    UploadStatus::Success(download_url.clone())
                }
                UploadOutcome::Failure { reason, .. } => UploadStatus::Error(reason.clone()),
                UploadOutcome::Cancelled { .. } => UploadStatus::Cancelled,
            };
            self.send_status(candidate.path(), status);
            report.record_outcome(candidate, outcome);
        }

        if self.cancel.is_cancelled() {
            tracing::warn!("batch cancelled, report is partial");
            report.mark_cancelled();
        }

        Ok(report)
    }

    /// Expands `root` into the regular files beneath it. A file root yields
    /// itself.
    pub fn discover(root: &Path, policy: &UploadPolicy) -> Result<Vec<PathBuf>> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };

        let metadata = fs::metadata(&root).map_err(|source| Error::RootUnreadable {
            path: root.clone(),
            source,
        })?;

        if !metadata.is_dir() {
            return Ok(vec![root]);
        }

        // Surface permission problems on the root itself instead of an empty batch.
        fs::read_dir(&root).map_err(|source| Error::RootUnreadable {
            path: root.clone(),
            source,
        })?;

        let mut files = Vec::new();
        let walker = WalkBuilder::new(&root)
            .standard_filters(policy.respect_ignore_files)
            .follow_links(policy.follow_links)
            .build();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().map_or(false, |ft| ft.is_file()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => tracing::warn!(error = %e, "skipping unreadable entry"),
            }
        }

        tracing::debug!(root = %root.display(), files = files.len(), "discovered files");
        Ok(files)
    }

    fn discover_and_validate(root: &Path, policy: &UploadPolicy) -> Result<Discovery> {
        let validator = FileValidator::new(policy);
        let mut discovery = Discovery {
            candidates: Vec::new(),
            rejected: Vec::new(),
        };

        for path in Self::discover(root, policy)? {
            match validator.validate(&path) {
                Ok(candidate) => discovery.candidates.push(candidate),
                Err(error) => discovery.rejected.push((path, error)),
            }
        }

        Ok(discovery)
    }

    fn send_status(&self, path: &Path, status: UploadStatus) {
        if let Some(sender) = &self.status_sender {
            sender
                .send(FileStatus {
                    path: path.to_path_buf(),
                    status,
                })
                .unwrap_or_default();
        }
    }
}
