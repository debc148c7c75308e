#![warn(missing_docs)]
//! # deepcheck-upload
//!
//! ## Purpose
//! Submits one selected file to the detection service and returns a typed
//! outcome.
//!
//! ## Responsibilities
//! - Resolve the endpoint for a media kind and enforce transport security.
//! - Build a multipart body with a single `file` field.
//! - Report upload progress as floored integer percentages.
//! - Convert every failure into a [`SubmissionError`] at the client boundary.
//!
//! ## Data flow
//! [`AnalysisClient::submit`] -> [`UploadRequest`] -> [`AnalysisTransport`]
//! -> status check -> `deepcheck-analysis-contract` normalization.
//!
//! ## Ownership and lifetimes
//! Request bodies share the selected file's [`Bytes`] buffer; no copy of the
//! media is made for the upload.
//!
//! ## Error model
//! Transport-level failures are [`UploadError`]. Callers of
//! [`AnalysisClient::submit`] only ever see [`SubmissionError`], produced by
//! [`classify_upload_error`].
//!
//! ## Security and privacy notes
//! Bearer tokens and response bodies are never logged here; events carry the
//! file fingerprint, kind, size, and status code only.

mod progress;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deepcheck_analysis_contract::{
    AnalysisContractError, parse_analysis_response, parse_service_error,
};
use deepcheck_core::{AnalysisResult, MediaKind, SelectedFile, SubmissionError};
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use url::Url;

pub use progress::{ProgressSink, ProgressTracker};

/// Multipart field name carrying the file.
pub const FILE_FIELD: &str = "file";

/// Header carrying the file fingerprint.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Per-kind analysis endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisEndpoints {
    video: Option<Url>,
    image: Option<Url>,
    audio: Option<Url>,
    text: Option<Url>,
}

impl AnalysisEndpoints {
    /// Derives the default endpoints from a service base URL.
    ///
    /// Video, image, and audio map to `api/analyze/`, `api/analyze-image/`,
    /// and `api/analyze-audio/` under the base. Text has no endpoint.
    ///
    /// # Errors
    /// Returns [`UploadError::InvalidEndpoint`] when the base violates
    /// [`validate_endpoint`].
    pub fn from_base(base: &str) -> Result<Self, UploadError> {
        let mut base = validate_endpoint(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |path: &str| {
            base.join(path)
                .map_err(|error| UploadError::InvalidEndpoint(format!("{path}: {error}")))
        };

        Ok(Self {
            video: Some(join("api/analyze/")?),
            image: Some(join("api/analyze-image/")?),
            audio: Some(join("api/analyze-audio/")?),
            text: None,
        })
    }

    /// Returns a copy with the endpoint for `kind` replaced.
    ///
    /// # Errors
    /// Returns [`UploadError::InvalidEndpoint`] when `endpoint` violates
    /// [`validate_endpoint`].
    pub fn with_endpoint(mut self, kind: MediaKind, endpoint: &str) -> Result<Self, UploadError> {
        let endpoint = Some(validate_endpoint(endpoint)?);
        match kind {
            MediaKind::Video => self.video = endpoint,
            MediaKind::Image => self.image = endpoint,
            MediaKind::Audio => self.audio = endpoint,
            MediaKind::Text => self.text = endpoint,
        }
        Ok(self)
    }

    /// Endpoint for `kind`, if one is configured.
    pub fn endpoint_for(&self, kind: MediaKind) -> Option<&Url> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Image => self.image.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Text => self.text.as_ref(),
        }
    }
}

/// Validates an analysis endpoint.
///
/// HTTPS is required except for loopback hosts used in local development.
///
/// # Errors
/// Returns [`UploadError::InvalidEndpoint`] for unparseable URLs, non-HTTP
/// schemes, or plain HTTP on a non-loopback host.
pub fn validate_endpoint(raw: &str) -> Result<Url, UploadError> {
    let parsed = Url::parse(raw)
        .map_err(|error| UploadError::InvalidEndpoint(format!("{raw}: {error}")))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if is_loopback(&parsed) => Ok(parsed),
        "http" => Err(UploadError::InvalidEndpoint(format!(
            "{raw}: https is required outside loopback"
        ))),
        other => Err(UploadError::InvalidEndpoint(format!(
            "{raw}: unsupported scheme {other}"
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(address)) => address.is_loopback(),
        Some(url::Host::Ipv6(address)) => address.is_loopback(),
        None => false,
    }
}

/// One multipart upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Target endpoint.
    pub endpoint: Url,
    /// Multipart field name.
    pub field_name: &'static str,
    /// File name sent in the part's content disposition.
    pub file_name: String,
    /// Part content type.
    pub mime_type: String,
    /// File contents.
    pub bytes: Bytes,
    /// Value for [`IDEMPOTENCY_KEY_HEADER`].
    pub idempotency_key: String,
    /// Optional bearer token.
    pub bearer_token: Option<String>,
}

/// Raw HTTP exchange outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network seam used by [`AnalysisClient`].
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// Performs exactly one request, feeding `progress` as bytes are sent.
    ///
    /// # Errors
    /// Returns [`UploadError::Transport`] or [`UploadError::Timeout`] when no
    /// response was received.
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressTracker,
    ) -> Result<TransportResponse, UploadError>;
}

/// `reqwest` implementation of [`AnalysisTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with an optional whole-request timeout.
    ///
    /// # Errors
    /// Returns [`UploadError::Transport`] when the HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self, UploadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| UploadError::Transport(format!("build http client: {error}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn send(
        &self,
        request: UploadRequest,
        progress: ProgressTracker,
    ) -> Result<TransportResponse, UploadError> {
        let length = request.bytes.len() as u64;
        let part = Part::stream_with_length(counted_body(request.bytes, progress), length)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)
            .map_err(|error| UploadError::Transport(format!("invalid part type: {error}")))?;
        let form = Form::new().part(request.field_name, part);

        let mut builder = self
            .client
            .post(request.endpoint)
            .header(IDEMPOTENCY_KEY_HEADER, request.idempotency_key)
            .multipart(form);
        if let Some(token) = request.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok(TransportResponse { status, body })
    }
}

// Splits the payload into chunks so progress advances as the body is polled.
fn counted_body(bytes: Bytes, mut progress: ProgressTracker) -> reqwest::Body {
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(UPLOAD_CHUNK_BYTES)
        .map(|start| bytes.slice(start..(start + UPLOAD_CHUNK_BYTES).min(bytes.len())))
        .collect();

    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        progress.record(chunk.len() as u64);
        Ok::<Bytes, std::io::Error>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}

fn map_reqwest_error(error: reqwest::Error) -> UploadError {
    if error.is_timeout() {
        UploadError::Timeout
    } else {
        UploadError::Transport(error.to_string())
    }
}

/// Client submitting selected files for analysis.
#[derive(Clone)]
pub struct AnalysisClient {
    endpoints: AnalysisEndpoints,
    transport: Arc<dyn AnalysisTransport>,
    bearer_token: Option<String>,
}

impl AnalysisClient {
    /// Creates a client over `transport`.
    pub fn new(endpoints: AnalysisEndpoints, transport: Arc<dyn AnalysisTransport>) -> Self {
        Self {
            endpoints,
            transport,
            bearer_token: None,
        }
    }

    /// Sends `token` as a bearer credential with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Configured endpoints.
    pub fn endpoints(&self) -> &AnalysisEndpoints {
        &self.endpoints
    }

    /// Uploads `file` and returns the normalized result.
    ///
    /// Performs at most one network request and never retries. Progress is
    /// reported to `progress` in non-decreasing order and only when the body
    /// length is known.
    ///
    /// # Errors
    /// Returns a classified [`SubmissionError`]; see [`classify_upload_error`].
    pub async fn submit(
        &self,
        file: &SelectedFile,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<AnalysisResult, SubmissionError> {
        let kind = file.kind();
        let fingerprint = file.fingerprint();
        tracing::info!(
            stage = "upload",
            action = "submit",
            %kind,
            size = file.size(),
            fingerprint = %fingerprint,
            "submitting file for analysis"
        );

        match self.try_submit(file, fingerprint.clone(), progress).await {
            Ok(result) => {
                tracing::info!(
                    stage = "upload",
                    action = "complete",
                    %kind,
                    fingerprint = %fingerprint,
                    verdict = result.verdict.as_wire(),
                    confidence = result.confidence.value(),
                    "analysis received"
                );
                Ok(result)
            }
            Err(error) => {
                let failure = classify_upload_error(&error);
                tracing::warn!(
                    stage = "upload",
                    action = "fail",
                    %kind,
                    fingerprint = %fingerprint,
                    failure = %failure.kind,
                    status = error.status_code(),
                    "analysis attempt failed"
                );
                Err(failure)
            }
        }
    }

    async fn try_submit(
        &self,
        file: &SelectedFile,
        fingerprint: String,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<AnalysisResult, UploadError> {
        let kind = file.kind();
        let endpoint = self
            .endpoints
            .endpoint_for(kind)
            .ok_or(UploadError::UnsupportedKind(kind))?
            .clone();

        let request = UploadRequest {
            endpoint,
            field_name: FILE_FIELD,
            file_name: file.name().to_string(),
            mime_type: file.mime_type().to_string(),
            bytes: file.bytes().clone(),
            idempotency_key: fingerprint,
            bearer_token: self.bearer_token.clone(),
        };
        let tracker = ProgressTracker::new(Some(file.size()), progress);

        let response = self.transport.send(request, tracker).await?;
        if !response.is_success() {
            return Err(UploadError::Status {
                code: response.status,
                body: response.body,
            });
        }

        parse_analysis_response(kind, &response.body).map_err(UploadError::Payload)
    }
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("endpoints", &self.endpoints)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// Maps an upload failure onto the submission error taxonomy.
///
/// Transport failures and non-success statuses are network failures, a kind
/// without an endpoint is rejected, and an unparseable success body is
/// unknown.
pub fn classify_upload_error(error: &UploadError) -> SubmissionError {
    match error {
        UploadError::Transport(message) => SubmissionError::network_failure(message.clone()),
        UploadError::Timeout => SubmissionError::network_failure("request timed out"),
        UploadError::Status { code, body } => match parse_service_error(body) {
            Some(message) => {
                SubmissionError::network_failure(format!("server returned {code}: {message}"))
            }
            None => SubmissionError::network_failure(format!("server returned status {code}")),
        },
        UploadError::UnsupportedKind(kind) => {
            SubmissionError::rejected(format!("{} analysis is not available", kind.label()))
        }
        UploadError::InvalidEndpoint(message) => SubmissionError::rejected(message.clone()),
        UploadError::Payload(error) => SubmissionError::unknown(error.to_string()),
    }
}

/// Upload errors before classification.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Endpoint violates URL policy.
    #[error("invalid analysis endpoint: {0}")]
    InvalidEndpoint(String),
    /// No endpoint is configured for the media kind.
    #[error("no analysis endpoint for {0} files")]
    UnsupportedKind(MediaKind),
    /// Connection or I/O failure before a response arrived.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Service answered with a non-success status.
    #[error("unexpected status {code}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body.
        body: String,
    },
    /// Success body could not be normalized.
    #[error(transparent)]
    Payload(#[from] AnalysisContractError),
}

impl UploadError {
    /// HTTP status code, when a response was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UploadError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for endpoint policy and classification.

    use deepcheck_core::SubmissionErrorKind;

    use super::*;

    #[test]
    fn endpoints_derive_from_base_path() {
        let endpoints = AnalysisEndpoints::from_base("https://detector.example/service")
            .expect("base should be valid");

        assert_eq!(
            endpoints
                .endpoint_for(MediaKind::Image)
                .map(Url::as_str),
            Some("https://detector.example/service/api/analyze-image/")
        );
        assert_eq!(
            endpoints
                .endpoint_for(MediaKind::Video)
                .map(Url::as_str),
            Some("https://detector.example/service/api/analyze/")
        );
        assert!(endpoints.endpoint_for(MediaKind::Text).is_none());
    }

    #[test]
    fn plain_http_is_loopback_only() {
        assert!(validate_endpoint("http://localhost:8000/api/analyze/").is_ok());
        assert!(validate_endpoint("http://[::1]:8000/api/analyze/").is_ok());
        assert!(validate_endpoint("http://detector.example/api/analyze/").is_err());
        assert!(validate_endpoint("file:///tmp/analyze").is_err());
    }

    #[test]
    fn status_failures_carry_service_message() {
        let error = UploadError::Status {
            code: 400,
            body: r#"{"error":"Invalid request"}"#.to_string(),
        };
        let failure = classify_upload_error(&error);

        assert_eq!(failure.kind, SubmissionErrorKind::NetworkFailure);
        assert_eq!(failure.message, "server returned 400: Invalid request");
    }

    #[test]
    fn missing_endpoint_is_rejected() {
        let failure = classify_upload_error(&UploadError::UnsupportedKind(MediaKind::Text));
        assert_eq!(failure.kind, SubmissionErrorKind::Rejected);
    }
}
