//! Error types for the uploader.
//!
//! `Error` covers conditions that abort a whole batch (bad policy, unreadable
//! root). `ValidationError` and `UploadError` stay scoped to a single file and
//! never escape the batch.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid upload policy: {message}")]
    InvalidPolicy { message: String },

    #[error("Cannot read {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Error::InvalidPolicy {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

/// Why a path was turned away before any upload attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("file not found")]
    NotFound,

    #[error("not a regular file")]
    NotAFile,

    #[error("file too large ({size} bytes, limit is {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("extension {extension:?} is not allowed")]
    DisallowedExtension { extension: String },
}

/// A failed upload attempt. Every variant is retryable.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("upload rejected by server (status {0:?})")]
    Rejected(String),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
}
