#![warn(missing_docs)]
//! # deepcheck-core
//!
//! ## Purpose
//! Defines the pure data model shared by every `deepcheck` crate.
//!
//! ## Responsibilities
//! - Represent candidate and validated media files.
//! - Decide whether a candidate is acceptable for a media kind.
//! - Model the discriminated analysis result and the typed submission error.
//! - Hold the aggregate submission state rendered by views.
//!
//! ## Data flow
//! A caller wraps raw bytes in [`CandidateFile`]. [`MediaValidator`] turns it
//! into a [`SelectedFile`] or a [`ValidationRejected`] reason. Upload results
//! are normalized elsewhere into [`AnalysisResult`] values and stored in
//! [`SubmissionState`].
//!
//! ## Ownership and lifetimes
//! File bytes are held in [`bytes::Bytes`], so an upload attempt can take a
//! cheap clone without borrowing from the controller that owns the selection.
//!
//! ## Error model
//! Validation failures are [`ValidationRejected`] (recoverable, caller may
//! re-select). Model construction failures are [`CoreError`]. Attempt
//! failures are [`SubmissionError`] values carried in state, not propagated.
//!
//! ## Example
//! ```rust
//! use deepcheck_core::{CandidateFile, MediaKind, MediaValidator};
//!
//! let validator = MediaValidator::default();
//! let candidate = CandidateFile::new("cat.png", "image/png", vec![0_u8; 64]);
//! let selected = validator.accept(candidate, MediaKind::Image).unwrap();
//! assert_eq!(selected.kind(), MediaKind::Image);
//! ```

mod redact;
mod state;
mod validator;

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use redact::redact_sensitive;
pub use state::{SubmissionPhase, SubmissionState};
pub use validator::{
    DEFAULT_MAX_BYTES, MediaValidator, SizeLimits, TEXT_EXTENSIONS, ValidationRejected,
    file_extension, mime_from_extension, mime_matches_kind, normalize_mime, validate,
};

/// One mebibyte, the unit used by size ceilings.
pub const MEBIBYTE: u64 = 1024 * 1024;

/// Media category governing validation rules, endpoint, and result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Video files (`video/*`).
    Video,
    /// Still images (`image/*`).
    Image,
    /// Audio recordings (`audio/*`).
    Audio,
    /// Text and document files.
    Text,
}

impl MediaKind {
    /// Every media kind, in display order.
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Video,
        MediaKind::Image,
        MediaKind::Audio,
        MediaKind::Text,
    ];

    /// Top-level MIME type family accepted for this kind.
    pub fn mime_family(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Text => "text",
        }
    }

    /// Capitalized label used in headings and notifications.
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Image => "Image",
            MediaKind::Audio => "Audio",
            MediaKind::Text => "Text",
        }
    }

    /// Infers a media kind from a declared MIME type.
    ///
    /// Returns `None` for empty or unrecognized types.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let normalized = normalize_mime(mime_type)?;
        MediaKind::ALL
            .into_iter()
            .find(|kind| mime_matches_kind(&normalized, *kind))
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_family())
    }
}

impl FromStr for MediaKind {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "image" => Ok(MediaKind::Image),
            "audio" => Ok(MediaKind::Audio),
            "text" => Ok(MediaKind::Text),
            _ => Err(CoreError::UnknownMediaKind(raw.to_string())),
        }
    }
}

/// A file offered by a drop or pick event, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// File name as reported by the picker.
    pub name: String,
    /// Declared MIME type; may be empty when the source could not sniff it.
    pub mime_type: String,
    /// Raw file contents.
    pub bytes: Bytes,
}

impl CandidateFile {
    /// Creates a candidate from its parts.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Byte size of the candidate.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A file that passed validation for one media kind.
///
/// Only [`MediaValidator`] (or [`validate`] via [`SelectedFile::try_from_candidate`])
/// can construct this type, so holding one proves the file was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    mime_type: String,
    kind: MediaKind,
    bytes: Bytes,
}

impl SelectedFile {
    /// Validates `candidate` against `kind` and `max_bytes`.
    ///
    /// # Errors
    /// Returns the [`ValidationRejected`] reason when the candidate fails any
    /// rule.
    pub fn try_from_candidate(
        candidate: CandidateFile,
        kind: MediaKind,
        max_bytes: u64,
    ) -> Result<Self, ValidationRejected> {
        validate(&candidate, kind, max_bytes)?;
        let mime_type = normalize_mime(&candidate.mime_type).unwrap_or_default();
        Ok(Self {
            name: candidate.name,
            mime_type,
            kind,
            bytes: candidate.bytes,
        })
    }

    /// File name as selected by the user.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized MIME type (lowercase, parameters stripped).
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Media kind the file was accepted for.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Byte size.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Shared handle to the file bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Hex SHA-256 digest of the contents.
    ///
    /// Stable for identical bytes, so repeated attempts on one file share it.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.mime_family().as_bytes());
        hasher.update(b":");
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

/// Binary classification returned by the detection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Content judged authentic.
    Real,
    /// Content judged manipulated or generated.
    Fake,
}

impl Verdict {
    /// Parses the wire value (`"REAL"` / `"FAKE"`, case-insensitive).
    pub fn from_wire(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("REAL") {
            Some(Verdict::Real)
        } else if raw.eq_ignore_ascii_case("FAKE") {
            Some(Verdict::Fake)
        } else {
            None
        }
    }

    /// Wire spelling.
    pub fn as_wire(self) -> &'static str {
        match self {
            Verdict::Real => "REAL",
            Verdict::Fake => "FAKE",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Real => "Real",
            Verdict::Fake => "Fake",
        }
    }
}

/// Service certainty on a 0–100 scale, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Validates and rounds a raw confidence value.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidConfidence`] for non-finite values or values
    /// outside `[0, 100]`.
    pub fn new(raw: f64) -> Result<Self, CoreError> {
        if !raw.is_finite() || !(0.0..=100.0).contains(&raw) {
            return Err(CoreError::InvalidConfidence(raw));
        }
        Ok(Self(round_two_decimals(raw)))
    }

    /// Rounded value.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = CoreError;

    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One per-frame classification from a video analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePrediction {
    /// Whether the frame was judged fake.
    pub is_fake: bool,
    /// Frame-level confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Video-specific result fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    /// Number of frames the service sampled.
    pub total_frames: u32,
    /// Per-frame predictions in temporal order.
    pub frame_predictions: Vec<FramePrediction>,
    /// Per-frame face detection flags, when reported.
    pub faces_detected: Vec<bool>,
    /// Count of frames with a detected face.
    pub frames_with_faces: u32,
    /// Server-side URL of the processed video, when reported.
    pub video_url: Option<String>,
    /// File name echoed back by the service.
    pub filename: Option<String>,
}

/// Pixel geometry reported for an analyzed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Height in pixels.
    pub height: u32,
    /// Width in pixels.
    pub width: u32,
    /// Color channel count.
    pub channels: u32,
}

/// Image-specific result fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetails {
    /// Whether a face was found.
    pub face_detected: bool,
    /// Image geometry, when reported.
    pub dimensions: Option<ImageDimensions>,
}

/// Compact description of the waveform samples returned for audio.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaveformSummary {
    /// Number of samples received.
    pub sample_count: usize,
    /// Largest absolute amplitude.
    pub peak: f64,
    /// Root-mean-square amplitude.
    pub rms: f64,
}

impl WaveformSummary {
    /// Summarizes raw samples. Non-finite samples are skipped.
    pub fn from_samples(samples: &[f64]) -> Self {
        let finite: Vec<f64> = samples.iter().copied().filter(|s| s.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }

        let peak = finite.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
        let mean_square = finite.iter().map(|s| s * s).sum::<f64>() / finite.len() as f64;

        Self {
            sample_count: finite.len(),
            peak,
            rms: mean_square.sqrt(),
        }
    }
}

/// Compact description of spectral features returned for audio.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectralSummary {
    /// Number of numeric feature values received.
    pub value_count: usize,
    /// Mean feature value.
    pub mean: f64,
    /// Smallest feature value.
    pub min: f64,
    /// Largest feature value.
    pub max: f64,
}

impl SpectralSummary {
    /// Summarizes flattened feature values. Non-finite values are skipped.
    pub fn from_values(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;

        Self {
            value_count: finite.len(),
            mean,
            min,
            max,
        }
    }
}

/// Audio-specific result fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDetails {
    /// File name echoed back by the service.
    pub filename: Option<String>,
    /// Waveform summary.
    pub waveform: WaveformSummary,
    /// Spectral feature summary.
    pub spectral: SpectralSummary,
    /// Number of audio segments the service analyzed.
    pub segments_analyzed: u32,
}

/// Kind-specific extension of an [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultDetails {
    /// Video analysis fields.
    Video(VideoDetails),
    /// Image analysis fields.
    Image(ImageDetails),
    /// Audio analysis fields.
    Audio(AudioDetails),
}

/// Normalized verdict envelope shared by every media kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Binary classification.
    pub verdict: Verdict,
    /// Certainty in the verdict.
    pub confidence: Confidence,
    /// Kind-specific fields.
    pub details: ResultDetails,
}

impl AnalysisResult {
    /// Media kind this result was produced for.
    pub fn kind(&self) -> MediaKind {
        match self.details {
            ResultDetails::Video(_) => MediaKind::Video,
            ResultDetails::Image(_) => MediaKind::Image,
            ResultDetails::Audio(_) => MediaKind::Audio,
        }
    }
}

/// Classification of a failed submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionErrorKind {
    /// Transport failure or non-success HTTP status.
    NetworkFailure,
    /// The client refused to submit (no endpoint for the media kind).
    Rejected,
    /// The service answered successfully but the payload was malformed.
    Unknown,
}

impl fmt::Display for SubmissionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmissionErrorKind::NetworkFailure => "network failure",
            SubmissionErrorKind::Rejected => "rejected",
            SubmissionErrorKind::Unknown => "unknown",
        })
    }
}

/// Typed failure of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct SubmissionError {
    /// Failure classification.
    pub kind: SubmissionErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl SubmissionError {
    /// Creates a [`SubmissionErrorKind::NetworkFailure`] error.
    pub fn network_failure(message: impl Into<String>) -> Self {
        Self {
            kind: SubmissionErrorKind::NetworkFailure,
            message: message.into(),
        }
    }

    /// Creates a [`SubmissionErrorKind::Rejected`] error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: SubmissionErrorKind::Rejected,
            message: message.into(),
        }
    }

    /// Creates a [`SubmissionErrorKind::Unknown`] error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            kind: SubmissionErrorKind::Unknown,
            message: message.into(),
        }
    }
}

/// Upload percentage for one attempt, in `[0, 100]`.
///
/// Values only move forward within an attempt; [`UploadProgress::reset`]
/// starts a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadProgress(u8);

impl UploadProgress {
    /// Progress at the start of an attempt.
    pub const ZERO: UploadProgress = UploadProgress(0);
    /// Progress of a completed attempt.
    pub const COMPLETE: UploadProgress = UploadProgress(100);

    /// Current percentage.
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Moves progress forward to `percent` (clamped to 100).
    ///
    /// Returns `true` when the stored value changed. Lower values are ignored.
    pub fn advance(&mut self, percent: u8) -> bool {
        let next = percent.min(100);
        if next > self.0 {
            self.0 = next;
            return true;
        }
        false
    }

    /// Marks the attempt as fully uploaded.
    pub fn complete(&mut self) {
        self.0 = 100;
    }

    /// Returns to zero for a fresh attempt.
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Error type for core model construction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Confidence is non-finite or outside `[0, 100]`.
    #[error("confidence {0} is outside [0, 100]")]
    InvalidConfidence(f64),
    /// Media kind string is not recognized.
    #[error("unknown media kind: {0}")]
    UnknownMediaKind(String),
}
