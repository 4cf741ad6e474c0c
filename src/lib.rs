//! Concurrent batch uploader for Gofile-style object storage.
//!
//! `upload::BatchOrchestrator` is the entry point: it expands a file or folder
//! into candidates, validates them, uploads with bounded concurrency and
//! retries, and returns a `upload::BatchReport`. The `app` module is the
//! console front-end used by the `gofile-uploader` binary.

pub mod app;
pub mod config;
pub mod error;
pub mod upload;
pub mod utils;

pub use error::{Error, Result};
