use crate::error::ValidationError;
use crate::upload::types::{
    serialize_path, FailureReason, FileCandidate, UploadOutcome, UploadedFile,
};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Result of one batch. Only the orchestrator writes to it.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchReport {
    successful: Vec<UploadedFile>,
    #[serde(serialize_with = "serialize_failures")]
    failed: HashMap<PathBuf, FailureReason>,
    total_bytes: u64,
    uploaded_bytes: u64,
    cancelled: bool,
}

struct PathKey<'a>(&'a Path);

impl Serialize for PathKey<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_path(&self.0, serializer)
    }
}

fn serialize_failures<S: Serializer>(
    failed: &HashMap<PathBuf, FailureReason>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(failed.len()))?;
    for (path, reason) in failed {
        map.serialize_entry(&PathKey(path), reason)?;
    }
    map.end()
}

impl BatchReport {
    pub(crate) fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            ..Self::default()
        }
    }

    pub(crate) fn record_rejection(&mut self, path: PathBuf, error: ValidationError) {
        self.failed.insert(path, FailureReason::Rejected { error });
    }

    pub(crate) fn record_outcome(&mut self, candidate: FileCandidate, outcome: UploadOutcome) {
        let path = candidate.path().to_path_buf();
        match outcome {
            UploadOutcome::Success {
                download_url,
                bytes_sent,
                ..
            } => {
                self.uploaded_bytes += bytes_sent;
                self.successful.push(UploadedFile {
                    path,
                    download_url,
                    bytes: bytes_sent,
                });
            }
            UploadOutcome::Failure {
                reason,
                attempts_made,
            } => {
                self.failed.insert(
                    path,
                    FailureReason::Exhausted {
                        last_error: reason,
                        attempts: attempts_made,
                    },
                );
            }
            UploadOutcome::Cancelled { attempts_made } => {
                self.failed.insert(
                    path,
                    FailureReason::Cancelled {
                        attempts: attempts_made,
                    },
                );
            }
        }
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn successful(&self) -> &[UploadedFile] {
        &self.successful
    }

    pub fn failed(&self) -> &HashMap<PathBuf, FailureReason> {
        &self.failed
    }

    pub fn failure(&self, path: &Path) -> Option<&FailureReason> {
        self.failed.get(path)
    }

    /// Bytes of every file that passed validation.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn processed(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn rejected(&self) -> impl Iterator<Item = (&PathBuf, &ValidationError)> {
        self.failed
            .iter()
            .filter_map(|(path, reason)| reason.validation_error().map(|error| (path, error)))
    }
}
