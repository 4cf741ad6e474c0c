use super::Uploader;
use crate::upload::{display_name, BatchReport, FileStatus, UploadStatus};
use crate::utils::FileSizeUtils;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use tracing_subscriber::fmt::MakeWriter;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}";

pub fn create_progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    ProgressBar::new(0).with_style(style)
}

/// Log writer that clears the progress bar while a record is written and
/// redraws it afterwards.
#[derive(Clone)]
pub struct SuspendingWriter<M = fn() -> io::Stderr> {
    bar: ProgressBar,
    inner: M,
}

impl SuspendingWriter {
    pub fn stderr(bar: ProgressBar) -> Self {
        Self {
            bar,
            inner: io::stderr,
        }
    }
}

impl<M> SuspendingWriter<M> {
    pub fn new(bar: ProgressBar, inner: M) -> Self {
        Self { bar, inner }
    }
}

pub struct SuspendedWrite<W> {
    bar: ProgressBar,
    inner: W,
}

impl<W: io::Write> io::Write for SuspendedWrite<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bar.suspend(|| self.inner.write(buf))
    }

    // fmt hands over a whole record at once; keep it to a single redraw.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.bar.suspend(|| self.inner.write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for SuspendingWriter<M> {
    type Writer = SuspendedWrite<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedWrite {
            bar: self.bar.clone(),
            inner: self.inner.make_writer(),
        }
    }
}

impl Uploader {
    pub(super) fn render_status(&self, status: &FileStatus) {
        let name = status.name();
        match &status.status {
            UploadStatus::Processing { attempt } => {
                if *attempt == 1 {
                    self.progress_bar.set_message(format!("📤 {}", name));
                }
            }
            UploadStatus::Retrying {
                attempt,
                error,
                delay,
            } => {
                self.progress_bar.println(format!(
                    "Attempt {}/{} for {} failed: {}. Retrying in {:.1}s...",
                    attempt,
                    self.settings.policy.max_retries,
                    name,
                    error,
                    delay.as_secs_f32()
                ));
            }
            UploadStatus::Success(url) => {
                self.progress_bar.println(format!(
                    "✓ Successfully uploaded: {}\n  Download link: {}",
                    name, url
                ));
            }
            UploadStatus::Error(reason) => {
                self.progress_bar
                    .println(format!("✗ Failed to upload {}: {}", name, reason));
            }
            UploadStatus::Skipped(reason) => {
                self.progress_bar
                    .println(format!("⏩ Skipped {}: {}", name, reason));
            }
            UploadStatus::Cancelled => {
                self.progress_bar.println(format!("⏹ Cancelled {}", name));
            }
        }
    }

    /// Prints the batch size once, as soon as the tracker knows it.
    pub(super) fn render_batch_start(&self) {
        let progress = &self.state.progress;
        self.progress_bar
            .println(format!("Found {} valid files to upload", progress.total));
        self.progress_bar.println(format!(
            "Total size: {}",
            FileSizeUtils::format_size(progress.total_bytes)
        ));
    }

    pub(super) fn render_progress(&self) {
        let progress = &self.state.progress;
        self.progress_bar.set_length(progress.total as u64);
        self.progress_bar.set_position(progress.completed as u64);
        if progress.is_finished() {
            self.progress_bar.set_message(format!(
                "{} / {}",
                FileSizeUtils::format_size(progress.uploaded_bytes),
                FileSizeUtils::format_size(progress.total_bytes)
            ));
        }
    }

    pub fn render_summary(&self, report: &BatchReport) {
        if self.state.progress.total == 0 {
            println!("No valid files found to upload!");
        }

        println!("\n=== Upload Summary ===");
        println!("Total files processed: {}", report.processed());
        println!("Successfully uploaded: {}", report.successful().len());
        println!("Failed uploads: {}", report.failed().len());
        println!(
            "Total data uploaded: {} of {}",
            FileSizeUtils::format_size(report.uploaded_bytes()),
            FileSizeUtils::format_size(report.total_bytes())
        );
        println!("{}", self.state.get_status_text());

        if report.was_cancelled() {
            println!("\nUpload was cancelled; the summary above is partial.");
        }

        if !report.failed().is_empty() {
            println!("\nFailed uploads details:");
            let mut failed: Vec<_> = report.failed().iter().collect();
            failed.sort_by(|a, b| a.0.cmp(b.0));
            for (path, reason) in failed {
                println!("- {}: {}", display_name(path), reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn log_records_reach_the_inner_writer() {
        let captured = Captured::default();
        let bar = ProgressBar::hidden();
        bar.set_length(4);
        bar.set_position(1);

        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(SuspendingWriter::new(bar.clone(), captured.clone()))
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(path = "/data/a.txt", "giving up on file");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("giving up on file"));
        assert!(output.contains("/data/a.txt"));
        assert_eq!(output.lines().count(), 1);
        assert_eq!(bar.position(), 1);
        assert!(!bar.is_finished());
    }
}
