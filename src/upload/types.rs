use crate::error::ValidationError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A file that passed validation and is waiting for its upload outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    path: PathBuf,
    size: u64,
    extension: String,
}

impl FileCandidate {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            path,
            size,
            extension,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lowercased extension without the leading dot, empty when there is none.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

/// Last component of `path`, lossily decoded. Empty for paths like `/` or `..`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

/// Writes a path as a plain string. Bytes that are not valid UTF-8 become
/// U+FFFD instead of failing the whole document.
pub(crate) fn serialize_path<P, S>(path: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    serializer.serialize_str(&path.as_ref().to_string_lossy())
}

/// What the remote service hands back for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success {
        download_url: String,
        bytes_sent: u64,
        attempts: u32,
    },
    Failure {
        reason: String,
        attempts_made: u32,
    },
    Cancelled {
        attempts_made: u32,
    },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            UploadOutcome::Success { attempts, .. } => *attempts,
            UploadOutcome::Failure { attempts_made, .. }
            | UploadOutcome::Cancelled { attempts_made } => *attempts_made,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    #[serde(serialize_with = "serialize_path")]
    pub path: PathBuf,
    pub download_url: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    Rejected { error: ValidationError },
    Exhausted { last_error: String, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl FailureReason {
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            FailureReason::Rejected { error } => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Rejected { error } => write!(f, "rejected: {}", error),
            FailureReason::Exhausted {
                last_error,
                attempts,
            } => write!(f, "{} (after {} attempts)", last_error, attempts),
            FailureReason::Cancelled { attempts: 0 } => write!(f, "cancelled before upload"),
            FailureReason::Cancelled { attempts } => {
                write!(f, "cancelled after {} attempts", attempts)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Processing { attempt: u32 },
    Retrying {
        attempt: u32,
        error: String,
        delay: Duration,
    },
    Success(String),
    Error(String),
    Skipped(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: PathBuf,
    pub status: UploadStatus,
}

impl FileStatus {
    pub fn name(&self) -> String {
        display_name(&self.path)
    }
}
