//! `deepcheck` command-line client.
//!
//! Reads configuration from the environment (and `.env`), then validates a
//! local file and submits it to the detection service.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::{Parser, Subcommand};
use deepcheck_app::{
    AppConfig, ControllerError, SubmissionController, SubmissionSession, app_version,
    candidate_from_path, init_tracing,
};
use deepcheck_auth::LoggingRedirect;
use deepcheck_core::{CandidateFile, MediaKind, MediaValidator};
use deepcheck_preview::TempDirPreviewStore;
use deepcheck_ui::{TracingNotificationSink, present, project_submission};
use deepcheck_upload::{AnalysisClient, HttpTransport};

const EXIT_FAILED: u8 = 1;
const EXIT_REJECTED: u8 = 2;
const EXIT_UNAUTHORIZED: u8 = 3;

#[derive(Parser)]
#[command(name = "deepcheck", version = deepcheck_app::APP_VERSION, about = "Deepfake detection client")]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
    /// Detection service base URL (overrides DEEPCHECK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Whole-request timeout in seconds (overrides DEEPCHECK_REQUEST_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a file and submit it for analysis
    Analyze {
        /// Path to the media file
        path: PathBuf,
        /// Media kind: video, image, audio, or text (inferred when omitted)
        #[arg(long)]
        kind: Option<MediaKind>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a file without uploading it
    Check {
        /// Path to the media file
        path: PathBuf,
        /// Media kind: video, image, audio, or text (inferred when omitted)
        #[arg(long)]
        kind: Option<MediaKind>,
    },
    /// Print the build version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Analyze { path, kind, json } => analyze(&config, &path, kind, json).await,
        Commands::Check { path, kind } => check(&config, &path, kind),
        Commands::Version => {
            println!("{}", app_version());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let api_url = cli.api_url.clone();
    let timeout = cli.timeout_secs.map(|secs| secs.to_string());
    AppConfig::from_lookup(move |key| match key {
        "DEEPCHECK_API_URL" if api_url.is_some() => api_url.clone(),
        "DEEPCHECK_REQUEST_TIMEOUT_SECS" if timeout.is_some() => timeout.clone(),
        _ => std::env::var(key).ok(),
    })
    .context("Failed to load configuration")
}

fn resolve_kind(explicit: Option<MediaKind>, candidate: &CandidateFile) -> anyhow::Result<MediaKind> {
    explicit
        .or_else(|| MediaKind::from_mime(&candidate.mime_type))
        .with_context(|| format!("Cannot infer media kind for {}; pass --kind", candidate.name))
}

fn check(config: &AppConfig, path: &Path, kind: Option<MediaKind>) -> anyhow::Result<ExitCode> {
    let candidate = candidate_from_path(path)?;
    let kind = resolve_kind(kind, &candidate)?;

    match MediaValidator::new(config.limits).validate(&candidate, kind) {
        Ok(()) => {
            println!(
                "accepted: {} ({kind}, {})",
                candidate.name,
                deepcheck_ui::format_size(candidate.size())
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(reason) => {
            eprintln!("rejected: {reason}");
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}

async fn analyze(
    config: &AppConfig,
    path: &Path,
    kind: Option<MediaKind>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let candidate = candidate_from_path(path)?;
    let kind = resolve_kind(kind, &candidate)?;

    let previews = TempDirPreviewStore::new().context("Failed to create preview directory")?;
    let redirect = LoggingRedirect::new(&config.sign_in_url).context("Invalid sign-in URL")?;
    let controller = SubmissionController::new(
        MediaValidator::new(config.limits),
        Arc::new(previews),
        Arc::new(TracingNotificationSink),
        Arc::new(redirect),
    );

    let transport = HttpTransport::new(config.request_timeout)?;
    let mut client = AnalysisClient::new(config.endpoints.clone(), Arc::new(transport));
    if let Some(token) = &config.access_token {
        client = client.with_bearer_token(token.clone());
    }
    let mut session = SubmissionSession::new(controller, client);

    if let Err(error) = session.controller_mut().select_file(candidate, kind) {
        eprintln!("{error}");
        return Ok(ExitCode::from(EXIT_REJECTED));
    }
    if let Some(preview) = session.controller().preview() {
        eprintln!("preview: {} ({})", preview.url(), preview.mime_type());
    }

    let gate = config.session_gate(unix_millis());
    match session.start(&gate) {
        Ok(_) => {}
        Err(ControllerError::Unauthorized) => {
            eprintln!("sign in required: {}", config.sign_in_url);
            return Ok(ExitCode::from(EXIT_UNAUTHORIZED));
        }
        Err(error) => return Err(error.into()),
    }

    let started = Instant::now();
    while session.controller().current_attempt().is_some() {
        if session.next_event().await.is_none() {
            break;
        }
        let view = project_submission(session.controller().state(), started.elapsed());
        if let Some(progress) = view.progress {
            eprint!("\r{} {}", progress.text, progress.loading.headline);
        }
    }
    eprintln!();

    let state = session.controller().state();
    if let Some(result) = &state.result {
        let view = present(result);
        if json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            println!("Verdict: {} ({})", view.verdict_label, view.headline);
            println!("Confidence: {}", view.confidence_text);
            for row in &view.details {
                println!("{}: {}", row.label, row.value);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(error) = &state.error {
        eprintln!("analysis failed ({}): {}", error.kind, error.message);
    }
    Ok(ExitCode::from(EXIT_FAILED))
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
