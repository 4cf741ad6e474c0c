use crate::config::UploadPolicy;
use crate::error::UploadError;
use crate::upload::client::UploadClient;
use crate::upload::progress::ProgressTracker;
use crate::upload::types::{FileCandidate, FileStatus, UploadOutcome, UploadReceipt, UploadStatus};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Wraps an `UploadClient` with the policy's attempt limit, backoff and
/// per-attempt timeout. Each call owns its own retry loop, so one file
/// waiting on backoff never holds up another.
#[derive(Clone)]
pub struct RetryingUploader {
    client: Arc<dyn UploadClient>,
    policy: Arc<UploadPolicy>,
    tracker: Option<Arc<ProgressTracker>>,
    status_sender: Option<UnboundedSender<FileStatus>>,
}

impl RetryingUploader {
    pub fn new(client: Arc<dyn UploadClient>, policy: Arc<UploadPolicy>) -> Self {
        Self {
            client,
            policy,
            tracker: None,
            status_sender: None,
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_status_sender(mut self, sender: UnboundedSender<FileStatus>) -> Self {
        self.status_sender = Some(sender);
        self
    }

    pub async fn upload_with_retry(
        &self,
        candidate: &FileCandidate,
        cancel: &CancellationToken,
    ) -> UploadOutcome {
        let max_attempts = self.policy.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return UploadOutcome::Cancelled {
                    attempts_made: attempt - 1,
                };
            }

            self.send_status(candidate, UploadStatus::Processing { attempt });
            if let Some(tracker) = &self.tracker {
                tracker.record_attempt_start();
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return UploadOutcome::Cancelled { attempts_made: attempt };
                }
                result = self.attempt(candidate) => result,
            };

            match result {
                Ok(receipt) => {
                    tracing::debug!(
                        path = %candidate.path().display(),
                        attempt,
                        url = %receipt.download_url,
                        "upload succeeded"
                    );
                    return UploadOutcome::Success {
                        download_url: receipt.download_url,
                        bytes_sent: candidate.size(),
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    tracing::debug!(
                        path = %candidate.path().display(),
                        attempt,
                        max_attempts,
                        error = %err,
                        "upload attempt failed"
                    );
                    last_error = err.to_string();

                    if attempt < max_attempts {
                        let delay = self.policy.backoff.delay(attempt);
                        self.send_status(
                            candidate,
                            UploadStatus::Retrying {
                                attempt,
                                error: last_error.clone(),
                                delay,
                            },
                        );
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                return UploadOutcome::Cancelled { attempts_made: attempt };
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }

        tracing::warn!(
            path = %candidate.path().display(),
            attempts = max_attempts,
            error = %last_error,
            "giving up on file"
        );
        UploadOutcome::Failure {
            reason: last_error,
            attempts_made: max_attempts,
        }
    }

    async fn attempt(&self, candidate: &FileCandidate) -> Result<UploadReceipt, UploadError> {
        let upload = self.client.upload(candidate, &self.policy.destination);
        match self.policy.attempt_timeout() {
            Some(limit) => tokio::time::timeout(limit, upload)
                .await
                .unwrap_or(Err(UploadError::Timeout(limit))),
            None => upload.await,
        }
    }

    fn send_status(&self, candidate: &FileCandidate, status: UploadStatus) {
        if let Some(sender) = &self.status_sender {
            sender
                .send(FileStatus {
                    path: candidate.path().to_path_buf(),
                    status,
                })
                .unwrap_or_default();
        }
    }
}
