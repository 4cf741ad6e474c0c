mod state;
mod ui;

use crate::config::Settings;
use crate::error::Result;
use crate::upload::{
    BatchOrchestrator, BatchReport, FileStatus, GofileClient, ProgressSnapshot, UploadClient,
};
use indicatif::ProgressBar;
pub use state::UploadState;
pub use ui::{create_progress_bar, SuspendingWriter};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Console front-end around `BatchOrchestrator`: renders progress while the
/// batch runs and wires Ctrl-C to cancellation.
pub struct Uploader {
    settings: Settings,
    state: UploadState,
    progress_bar: ProgressBar,
}

impl Uploader {
    pub fn new(settings: Settings) -> Self {
        Self::with_progress_bar(settings, ui::create_progress_bar())
    }

    /// Same as `new` but never draws a progress bar.
    pub fn quiet(settings: Settings) -> Self {
        Self::with_progress_bar(settings, ProgressBar::hidden())
    }

    /// Draws on `progress_bar`, which the caller may also hand to a
    /// `SuspendingWriter` so log lines and the bar share the terminal.
    pub fn with_progress_bar(settings: Settings, progress_bar: ProgressBar) -> Self {
        Self {
            settings,
            state: UploadState::default(),
            progress_bar,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub async fn start_upload(&mut self, root: &Path) -> Result<BatchReport> {
        let client = GofileClient::new(self.settings.endpoint.clone())?;
        tracing::debug!(endpoint = client.endpoint(), "using upload endpoint");
        self.run(root, Arc::new(client)).await
    }

    pub async fn run(&mut self, root: &Path, client: Arc<dyn UploadClient>) -> Result<BatchReport> {
        self.state.clear();
        self.state.is_uploading = true;

        let (status_sender, mut status_receiver) = mpsc::unbounded_channel();
        let orchestrator = BatchOrchestrator::new(client).with_status_sender(status_sender);
        let tracker = orchestrator.tracker();
        let mut progress = tracker.subscribe();

        let cancel = orchestrator.cancellation_token();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling uploads");
                cancel.cancel();
            }
        });

        let policy = self.settings.policy.clone();
        let batch = orchestrator.run_batch(root, &policy);
        tokio::pin!(batch);

        let result = loop {
            tokio::select! {
                result = &mut batch => break result,
                Some(status) = status_receiver.recv() => self.update_state(status),
                Ok(()) = progress.changed() => {
                    let snapshot = *progress.borrow_and_update();
                    self.update_progress(snapshot);
                }
            }
        };
        interrupt.abort();

        while let Ok(status) = status_receiver.try_recv() {
            self.update_state(status);
        }
        self.update_progress(tracker.snapshot());
        self.state.is_uploading = false;
        self.progress_bar.finish();

        result
    }

    fn update_state(&mut self, status: FileStatus) {
        self.render_status(&status);
        self.state.apply(&status);
    }

    fn update_progress(&mut self, snapshot: ProgressSnapshot) {
        self.state.update_progress(snapshot);
        if !self.state.announced && snapshot.total > 0 {
            self.state.announced = true;
            self.render_batch_start();
        }
        self.render_progress();
    }
}
