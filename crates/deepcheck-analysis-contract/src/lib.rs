#![warn(missing_docs)]
//! # deepcheck-analysis-contract
//!
//! ## Purpose
//! Defines the detection service response payloads and their normalization
//! into the shared [`AnalysisResult`] envelope.
//!
//! ## Responsibilities
//! - Decode the per-kind JSON payloads (video, image, audio).
//! - Enforce mandatory fields: a `REAL`/`FAKE` verdict and an in-range
//!   confidence.
//! - Round confidence to two decimals and fill derived counts the service
//!   may omit.
//! - Extract the service's error text from failure bodies.
//!
//! ## Data flow
//! Raw response body -> [`parse_analysis_response`] -> per-kind payload ->
//! normalized [`AnalysisResult`] stored by the controller.
//!
//! ## Ownership and lifetimes
//! Payloads are owned structs; nothing borrows from the transient network
//! buffer.
//!
//! ## Error model
//! Undecodable JSON and contract violations return
//! [`AnalysisContractError`]; the upload layer classifies both as a
//! malformed success payload.

use deepcheck_core::{
    AnalysisResult, AudioDetails, Confidence, FramePrediction, ImageDetails, ImageDimensions,
    MediaKind, ResultDetails, SpectralSummary, Verdict, VideoDetails, WaveformSummary,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Video endpoint response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysisPayload {
    /// `"REAL"` or `"FAKE"`.
    pub result: String,
    /// Confidence on a 0–100 scale.
    pub confidence: f64,
    /// URL of the processed video, if the service keeps one.
    #[serde(default)]
    pub video_url: Option<String>,
    /// Echoed upload file name.
    #[serde(default)]
    pub filename: Option<String>,
    /// `[is_fake, confidence]` pairs in frame order.
    #[serde(default)]
    pub frame_predictions: Vec<(bool, f64)>,
    /// Per-frame face detection flags.
    #[serde(default)]
    pub faces_detected: Vec<bool>,
    /// Number of sampled frames.
    #[serde(default)]
    pub total_frames: Option<u32>,
    /// Number of frames with a face.
    #[serde(default)]
    pub frames_with_faces: Option<u32>,
}

/// Image endpoint response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysisPayload {
    /// `"REAL"` or `"FAKE"`.
    pub result: String,
    /// Confidence on a 0–100 scale.
    pub confidence: f64,
    /// Whether a face was found.
    #[serde(default)]
    pub face_detected: bool,
    /// `[height, width, channels]`.
    #[serde(default)]
    pub image_size: Option<Vec<u32>>,
}

/// Audio endpoint response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAnalysisPayload {
    /// `"REAL"` or `"FAKE"`.
    pub result: String,
    /// Confidence on a 0–100 scale.
    pub confidence: f64,
    /// Echoed upload file name.
    #[serde(default)]
    pub filename: Option<String>,
    /// Waveform samples; any nesting of numeric arrays.
    #[serde(default)]
    pub waveform_data: Value,
    /// Spectral features; any nesting of numeric arrays or maps.
    #[serde(default)]
    pub spectral_features: Value,
    /// Number of analyzed segments.
    #[serde(default)]
    pub segments_analyzed: Option<u32>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct ServiceErrorBody {
    error: String,
}

/// Parses a success body for `kind` into a normalized result.
///
/// # Errors
/// Returns [`AnalysisContractError::UnsupportedKind`] for kinds without a
/// response contract, [`AnalysisContractError::Decode`] for invalid JSON, and
/// [`AnalysisContractError::InvalidContract`] for semantic violations.
pub fn parse_analysis_response(
    kind: MediaKind,
    raw: &str,
) -> Result<AnalysisResult, AnalysisContractError> {
    match kind {
        MediaKind::Video => parse_video_response(raw),
        MediaKind::Image => parse_image_response(raw),
        MediaKind::Audio => parse_audio_response(raw),
        MediaKind::Text => Err(AnalysisContractError::UnsupportedKind(kind)),
    }
}

/// Parses and normalizes a video response body.
///
/// # Errors
/// See [`parse_analysis_response`].
pub fn parse_video_response(raw: &str) -> Result<AnalysisResult, AnalysisContractError> {
    let payload: VideoAnalysisPayload = serde_json::from_str(raw)?;
    normalize_video(payload)
}

/// Parses and normalizes an image response body.
///
/// # Errors
/// See [`parse_analysis_response`].
pub fn parse_image_response(raw: &str) -> Result<AnalysisResult, AnalysisContractError> {
    let payload: ImageAnalysisPayload = serde_json::from_str(raw)?;
    normalize_image(payload)
}

/// Parses and normalizes an audio response body.
///
/// # Errors
/// See [`parse_analysis_response`].
pub fn parse_audio_response(raw: &str) -> Result<AnalysisResult, AnalysisContractError> {
    let payload: AudioAnalysisPayload = serde_json::from_str(raw)?;
    normalize_audio(payload)
}

/// Normalizes a decoded video payload.
///
/// Missing `total_frames` falls back to the number of frame predictions;
/// missing `frames_with_faces` falls back to the count of `true` face flags.
///
/// # Errors
/// Returns [`AnalysisContractError::InvalidContract`] for a bad verdict or
/// confidence.
pub fn normalize_video(payload: VideoAnalysisPayload) -> Result<AnalysisResult, AnalysisContractError> {
    let (verdict, confidence) = verdict_and_confidence(&payload.result, payload.confidence)?;

    let frame_predictions: Vec<FramePrediction> = payload
        .frame_predictions
        .into_iter()
        .map(|(is_fake, confidence)| FramePrediction {
            is_fake,
            confidence: confidence.clamp(0.0, 1.0),
        })
        .collect();

    let total_frames = payload
        .total_frames
        .unwrap_or(frame_predictions.len() as u32);
    let frames_with_faces = payload
        .frames_with_faces
        .unwrap_or(payload.faces_detected.iter().filter(|face| **face).count() as u32);

    Ok(AnalysisResult {
        verdict,
        confidence,
        details: ResultDetails::Video(VideoDetails {
            total_frames,
            frame_predictions,
            faces_detected: payload.faces_detected,
            frames_with_faces,
            video_url: payload.video_url,
            filename: payload.filename,
        }),
    })
}

/// Normalizes a decoded image payload.
///
/// # Errors
/// Returns [`AnalysisContractError::InvalidContract`] for a bad verdict,
/// confidence, or an `image_size` that is not `[height, width, channels]`.
pub fn normalize_image(payload: ImageAnalysisPayload) -> Result<AnalysisResult, AnalysisContractError> {
    let (verdict, confidence) = verdict_and_confidence(&payload.result, payload.confidence)?;

    let dimensions = match payload.image_size.as_deref() {
        None => None,
        Some([height, width, channels]) => Some(ImageDimensions {
            height: *height,
            width: *width,
            channels: *channels,
        }),
        Some(other) => {
            return Err(AnalysisContractError::InvalidContract(format!(
                "image_size must have 3 entries, got {}",
                other.len()
            )));
        }
    };

    Ok(AnalysisResult {
        verdict,
        confidence,
        details: ResultDetails::Image(ImageDetails {
            face_detected: payload.face_detected,
            dimensions,
        }),
    })
}

/// Normalizes a decoded audio payload.
///
/// # Errors
/// Returns [`AnalysisContractError::InvalidContract`] for a bad verdict or
/// confidence.
pub fn normalize_audio(payload: AudioAnalysisPayload) -> Result<AnalysisResult, AnalysisContractError> {
    let (verdict, confidence) = verdict_and_confidence(&payload.result, payload.confidence)?;

    let mut samples = Vec::new();
    collect_numbers(&payload.waveform_data, &mut samples);
    let mut features = Vec::new();
    collect_numbers(&payload.spectral_features, &mut features);

    Ok(AnalysisResult {
        verdict,
        confidence,
        details: ResultDetails::Audio(AudioDetails {
            filename: payload.filename,
            waveform: WaveformSummary::from_samples(&samples),
            spectral: SpectralSummary::from_values(&features),
            segments_analyzed: payload.segments_analyzed.unwrap_or(0),
        }),
    })
}

/// Extracts the `error` text from a failure body, if present.
pub fn parse_service_error(raw: &str) -> Option<String> {
    serde_json::from_str::<ServiceErrorBody>(raw)
        .ok()
        .map(|body| body.error)
        .filter(|message| !message.trim().is_empty())
}

fn verdict_and_confidence(
    result: &str,
    confidence: f64,
) -> Result<(Verdict, Confidence), AnalysisContractError> {
    let verdict = Verdict::from_wire(result).ok_or_else(|| {
        AnalysisContractError::InvalidContract(format!("unknown result value: {result:?}"))
    })?;
    let confidence = Confidence::new(confidence)
        .map_err(|error| AnalysisContractError::InvalidContract(error.to_string()))?;
    Ok((verdict, confidence))
}

fn collect_numbers(value: &Value, out: &mut Vec<f64>) {
    match value {
        Value::Number(number) => {
            if let Some(number) = number.as_f64() {
                out.push(number);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_numbers(item, out)),
        Value::Object(fields) => fields.values().for_each(|item| collect_numbers(item, out)),
        Value::Null | Value::Bool(_) | Value::String(_) => {}
    }
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Decoded payload violates contract invariants.
    #[error("analysis contract violation: {0}")]
    InvalidContract(String),
    /// No response contract exists for the media kind.
    #[error("no analysis contract for {0} files")]
    UnsupportedKind(MediaKind),
}

#[cfg(test)]
mod tests {
    //! Unit tests for payload normalization.

    use super::*;

    #[test]
    fn image_payload_rounds_confidence() {
        let raw = r#"{"result":"FAKE","confidence":87.456,"face_detected":true,"image_size":[512,512,3]}"#;
        let result = parse_image_response(raw).expect("payload should parse");

        assert_eq!(result.verdict, Verdict::Fake);
        assert_eq!(result.confidence.value(), 87.46);
        assert_eq!(
            result.details,
            ResultDetails::Image(ImageDetails {
                face_detected: true,
                dimensions: Some(ImageDimensions {
                    height: 512,
                    width: 512,
                    channels: 3,
                }),
            })
        );
    }

    #[test]
    fn video_payload_derives_missing_counts() {
        let raw = r#"{
            "result":"REAL",
            "confidence":64.2,
            "frame_predictions":[[false,0.8],[true,0.7],[false,0.9]],
            "faces_detected":[true,false,true]
        }"#;
        let result = parse_video_response(raw).expect("payload should parse");

        let ResultDetails::Video(details) = result.details else {
            panic!("expected video details");
        };
        assert_eq!(details.total_frames, 3);
        assert_eq!(details.frames_with_faces, 2);
        assert!(details.frame_predictions[1].is_fake);
    }

    #[test]
    fn unknown_verdict_is_a_contract_violation() {
        let raw = r#"{"result":"UNSURE","confidence":50.0}"#;
        assert!(matches!(
            parse_image_response(raw),
            Err(AnalysisContractError::InvalidContract(_))
        ));
    }

    #[test]
    fn service_error_text_is_extracted() {
        assert_eq!(
            parse_service_error(r#"{"error":"Invalid request"}"#).as_deref(),
            Some("Invalid request")
        );
        assert_eq!(parse_service_error("<html>502</html>"), None);
    }
}
