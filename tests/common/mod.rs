#![allow(dead_code)]

use async_trait::async_trait;
use gofile_uploader::config::{Backoff, Destination, UploadPolicy};
use gofile_uploader::error::UploadError;
use gofile_uploader::upload::{FileCandidate, UploadClient, UploadReceipt};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    AlwaysFail,
    /// Fails the first `n` calls for each file, then succeeds.
    FailTimes(u32),
}

/// Instrumented `UploadClient` that counts calls per file and tracks how
/// many uploads run at the same time.
pub struct StubClient {
    behavior: Behavior,
    delay: Duration,
    failing_names: Vec<String>,
    calls: Mutex<HashMap<PathBuf, u32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StubClient {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            failing_names: Vec::new(),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Files with these names always fail, whatever the default behavior.
    pub fn failing_for(mut self, names: &[&str]) -> Self {
        self.failing_names = names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn calls_for(&self, path: &Path) -> u32 {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadClient for StubClient {
    async fn upload(
        &self,
        candidate: &FileCandidate,
        _destination: &Destination,
    ) -> Result<UploadReceipt, UploadError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(candidate.path().to_path_buf()).or_insert(0);
            *count += 1;
            *count
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let fail = self.failing_names.contains(&candidate.file_name())
            || match self.behavior {
                Behavior::Succeed => false,
                Behavior::AlwaysFail => true,
                Behavior::FailTimes(n) => call <= n,
            };

        if fail {
            Err(UploadError::Status {
                status: 500,
                body: "internal error".into(),
            })
        } else {
            Ok(UploadReceipt {
                download_url: format!("https://gofile.io/d/{}-{}", candidate.file_name(), call),
            })
        }
    }
}

pub fn fast_policy(max_retries: u32, max_concurrent_uploads: usize) -> UploadPolicy {
    UploadPolicy {
        max_retries,
        max_concurrent_uploads,
        backoff: Backoff::Fixed { delay_ms: 1 },
        ..UploadPolicy::default()
    }
}

pub fn write_file(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, vec![b'x'; size]).unwrap();
    path
}
