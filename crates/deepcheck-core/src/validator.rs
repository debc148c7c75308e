//! Media acceptance rules: MIME family, text extension allow-list, size
//! ceiling. Every decision here is pure.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CandidateFile, MEBIBYTE, MediaKind, SelectedFile};

/// Ceiling applied to kinds without a dedicated limit.
pub const DEFAULT_MAX_BYTES: u64 = 100 * MEBIBYTE;

/// Extensions accepted for [`MediaKind::Text`].
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "doc", "docx", "pdf"];

// Document types that carry text but are not registered under `text/*`.
const TEXT_DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Per-kind byte ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    /// Ceiling for video files.
    pub video: u64,
    /// Ceiling for images.
    pub image: u64,
    /// Ceiling for audio files.
    pub audio: u64,
    /// Ceiling for text/document files.
    pub text: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            video: 100 * MEBIBYTE,
            image: 20 * MEBIBYTE,
            audio: DEFAULT_MAX_BYTES,
            text: 10 * MEBIBYTE,
        }
    }
}

impl SizeLimits {
    /// Returns the ceiling for `kind`.
    pub fn max_bytes(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Video => self.video,
            MediaKind::Image => self.image,
            MediaKind::Audio => self.audio,
            MediaKind::Text => self.text,
        }
    }

    /// Returns a copy with the ceiling for `kind` replaced.
    pub fn with_max_bytes(mut self, kind: MediaKind, max_bytes: u64) -> Self {
        match kind {
            MediaKind::Video => self.video = max_bytes,
            MediaKind::Image => self.image = max_bytes,
            MediaKind::Audio => self.audio = max_bytes,
            MediaKind::Text => self.text = max_bytes,
        }
        self
    }
}

/// Reason a candidate file was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationRejected {
    /// Declared MIME type is empty or unparseable.
    #[error("file type could not be determined")]
    MissingMimeType,
    /// MIME type is outside the family accepted for the kind.
    #[error("{mime_type} is not an accepted {kind} type")]
    MimeMismatch {
        /// Requested media kind.
        kind: MediaKind,
        /// Normalized declared MIME type.
        mime_type: String,
    },
    /// Extension is not on the allow-list for the kind.
    #[error("{file_name} does not have an accepted {kind} extension")]
    ExtensionNotAllowed {
        /// Requested media kind.
        kind: MediaKind,
        /// Offending file name.
        file_name: String,
    },
    /// File has no content.
    #[error("file is empty")]
    EmptyFile,
    /// File exceeds the ceiling for its kind.
    #[error("file is {size} bytes, larger than the {max} byte limit")]
    TooLarge {
        /// Candidate size in bytes.
        size: u64,
        /// Ceiling in bytes.
        max: u64,
    },
}

/// Validator bound to a set of per-kind ceilings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaValidator {
    limits: SizeLimits,
}

impl MediaValidator {
    /// Creates a validator with explicit ceilings.
    pub fn new(limits: SizeLimits) -> Self {
        Self { limits }
    }

    /// Configured ceilings.
    pub fn limits(&self) -> &SizeLimits {
        &self.limits
    }

    /// Checks `candidate` against the rules for `kind`.
    ///
    /// # Errors
    /// Returns the first failing rule as [`ValidationRejected`].
    pub fn validate(
        &self,
        candidate: &CandidateFile,
        kind: MediaKind,
    ) -> Result<(), ValidationRejected> {
        validate(candidate, kind, self.limits.max_bytes(kind))
    }

    /// Validates and converts `candidate` into a [`SelectedFile`].
    ///
    /// # Errors
    /// Returns the first failing rule as [`ValidationRejected`].
    pub fn accept(
        &self,
        candidate: CandidateFile,
        kind: MediaKind,
    ) -> Result<SelectedFile, ValidationRejected> {
        SelectedFile::try_from_candidate(candidate, kind, self.limits.max_bytes(kind))
    }
}

/// Checks one candidate against the MIME, extension, and size rules.
///
/// Rules are evaluated in that order, so a wrong-family file reports a type
/// mismatch even when it is also oversized. An empty MIME type fails closed.
///
/// # Errors
/// Returns the first failing rule as [`ValidationRejected`].
pub fn validate(
    candidate: &CandidateFile,
    kind: MediaKind,
    max_bytes: u64,
) -> Result<(), ValidationRejected> {
    let mime_type = normalize_mime(&candidate.mime_type).ok_or(ValidationRejected::MissingMimeType)?;

    if !mime_matches_kind(&mime_type, kind) {
        return Err(ValidationRejected::MimeMismatch { kind, mime_type });
    }

    if kind == MediaKind::Text {
        let allowed = file_extension(&candidate.name)
            .is_some_and(|extension| TEXT_EXTENSIONS.contains(&extension.as_str()));
        if !allowed {
            return Err(ValidationRejected::ExtensionNotAllowed {
                kind,
                file_name: candidate.name.clone(),
            });
        }
    }

    let size = candidate.size();
    if size == 0 {
        return Err(ValidationRejected::EmptyFile);
    }

    if size > max_bytes {
        return Err(ValidationRejected::TooLarge {
            size,
            max: max_bytes,
        });
    }

    Ok(())
}

/// Lowercases a MIME type and strips parameters.
///
/// Returns `None` unless the value has a non-empty `type/subtype` shape.
pub fn normalize_mime(raw: &str) -> Option<String> {
    let essence = raw.split(';').next().unwrap_or_default().trim();
    let (top, sub) = essence.split_once('/')?;
    if top.is_empty() || sub.is_empty() || sub.contains('/') {
        return None;
    }

    Some(essence.to_ascii_lowercase())
}

/// Returns `true` when a normalized MIME type belongs to the family of `kind`.
pub fn mime_matches_kind(mime_type: &str, kind: MediaKind) -> bool {
    let Some((top, _)) = mime_type.split_once('/') else {
        return false;
    };

    if top == kind.mime_family() {
        return true;
    }

    kind == MediaKind::Text && TEXT_DOCUMENT_MIME_TYPES.contains(&mime_type)
}

/// Lowercase extension of a file name, without the dot.
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
}

/// Maps a common media or document extension to its MIME type.
pub fn mime_from_extension(extension: &str) -> Option<&'static str> {
    let mime_type = match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "m4v" => "video/x-m4v",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(mime_type)
}
