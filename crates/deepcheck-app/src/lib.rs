#![warn(missing_docs)]
//! # deepcheck-app
//!
//! ## Purpose
//! Orchestrates validation, preview, authorization, upload, and presentation
//! for `deepcheck` submission surfaces.
//!
//! ## Responsibilities
//! - Own submission state through [`SubmissionController`].
//! - Run uploads off the intent path and discard late events from superseded
//!   attempts ([`SubmissionSession`]).
//! - Load configuration and install logging for the command-line client.
//! - Provide log redaction and the build version.
//!
//! ## Data flow
//! Candidate file -> controller (validate, preview) -> authorization gate ->
//! spawned `AnalysisClient::submit` -> tagged events -> controller -> views.
//!
//! ## Ownership and lifetimes
//! One controller per upload surface owns the state and the preview handle.
//! Spawned attempts own a cheap clone of the selected file and talk back only
//! through the session's channel.
//!
//! ## Error model
//! Intent failures are [`ControllerError`]; attempt failures are stored in
//! state as `SubmissionError`. Process-level setup failures are [`AppError`].
//!
//! ## Security and privacy notes
//! - Uploads are refused unless the authorization gate passes.
//! - Service error text passes through [`redact_sensitive`] before logging.
//! - Access tokens are redacted from configuration debug output.

mod config;
mod controller;
mod driver;
mod logging;

use std::path::Path;

use deepcheck_auth::AuthError;
use deepcheck_core::{CandidateFile, file_extension, mime_from_extension};
use deepcheck_preview::PreviewError;
use deepcheck_upload::UploadError;
use thiserror::Error;

pub use deepcheck_core::redact_sensitive;

pub use config::{AppConfig, DEFAULT_API_URL, DEFAULT_SIGN_IN_URL, DEFAULT_TOKEN_TTL};
pub use controller::{
    AnalysisTicket, AttemptEvent, AttemptToken, ControllerError, EventOutcome,
    SubmissionController,
};
pub use driver::{AttemptMessage, SubmissionSession};
pub use logging::{DEFAULT_LOG_FILTER, init_tracing};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("DEEPCHECK_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Reads a file from disk into a [`CandidateFile`].
///
/// The MIME type is inferred from the extension; unknown extensions yield an
/// empty type, which validation rejects.
///
/// # Errors
/// Returns [`AppError::Io`] when the file cannot be read.
pub fn candidate_from_path(path: &Path) -> Result<CandidateFile, AppError> {
    let bytes = std::fs::read(path)
        .map_err(|error| AppError::Io(format!("read {}: {error}", path.display())))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = file_extension(&name)
        .and_then(|extension| mime_from_extension(&extension))
        .unwrap_or_default();

    Ok(CandidateFile::new(name, mime_type, bytes))
}

/// Application setup errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
    /// Endpoint or transport setup failure.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// Sign-in target failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Preview store setup failure.
    #[error(transparent)]
    Preview(#[from] PreviewError),
    /// Controller intent failure.
    #[error(transparent)]
    Controller(#[from] ControllerError),
    /// Filesystem failure.
    #[error("io failure: {0}")]
    Io(String),
    /// Subscriber installation failure.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for file intake.

    use super::*;

    #[test]
    fn candidate_mime_type_follows_extension() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("Portrait.PNG");
        std::fs::write(&path, b"png").expect("fixture should be written");

        let candidate = candidate_from_path(&path).expect("fixture should be readable");
        assert_eq!(candidate.name, "Portrait.PNG");
        assert_eq!(candidate.mime_type, "image/png");
        assert_eq!(candidate.size(), 3);
    }
}
