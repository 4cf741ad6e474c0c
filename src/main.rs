use anyhow::Context;
use clap::Parser;
use gofile_uploader::app::{create_progress_bar, SuspendingWriter, Uploader};
use gofile_uploader::config::Settings;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "gofile-uploader", version, about = "Upload a file or a whole folder to Gofile")]
struct Cli {
    /// File or folder to upload
    path: PathBuf,

    /// Configuration file (defaults to the per-user config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Account token used for authenticated uploads
    #[arg(long, env = "GOFILE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Destination folder identifier
    #[arg(long, env = "GOFILE_FOLDER_ID")]
    folder_id: Option<String>,

    /// Upload endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Maximum number of uploads in flight
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Attempts per file, the first one included
    #[arg(short = 'r', long)]
    max_retries: Option<u32>,

    /// Write the final report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Do not draw the progress bar
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(token) = &self.token {
            settings.policy.destination.token = Some(token.clone());
        }
        if let Some(folder_id) = &self.folder_id {
            settings.policy.destination.folder_id = Some(folder_id.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(concurrency) = self.concurrency {
            settings.policy.max_concurrent_uploads = concurrency;
        }
        if let Some(max_retries) = self.max_retries {
            settings.policy.max_retries = max_retries;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let progress_bar = if cli.quiet {
        ProgressBar::hidden()
    } else {
        create_progress_bar()
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gofile_uploader=error".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(SuspendingWriter::stderr(progress_bar.clone())),
        )
        .init();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    cli.apply_overrides(&mut settings);

    println!("GoFile Uploader");
    println!("Uploading: {}", cli.path.display());

    let mut uploader = Uploader::with_progress_bar(settings, progress_bar);

    let report = uploader
        .start_upload(&cli.path)
        .await
        .with_context(|| format!("Upload of {} failed", cli.path.display()))?;

    uploader.render_summary(&report);

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
