mod client;
mod orchestrator;
mod progress;
mod report;
mod retry;
mod types;
mod validator;

pub use client::{GofileClient, UploadClient};
pub use orchestrator::BatchOrchestrator;
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use report::BatchReport;
pub use retry::RetryingUploader;
pub use types::{
    display_name, FailureReason, FileCandidate, FileStatus, UploadOutcome, UploadReceipt, UploadStatus,
    UploadedFile,
};
pub use validator::FileValidator;
