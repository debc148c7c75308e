//! Pure projection of analysis results.

use deepcheck_core::{
    AnalysisResult, AudioDetails, ImageDetails, MediaKind, ResultDetails, Verdict, VideoDetails,
};
use serde::Serialize;

/// One labeled value in the details grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    /// Row label.
    pub label: &'static str,
    /// Rendered value.
    pub value: String,
}

impl DetailRow {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

/// One marker on the video frame timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMarker {
    /// Frame index.
    pub index: usize,
    /// Horizontal offset in percent of the timeline width.
    pub position_percent: f64,
    /// Whether the frame was judged fake.
    pub is_fake: bool,
    /// Marker opacity, the frame confidence in `[0, 1]`.
    pub opacity: f64,
    /// Hover text.
    pub tooltip: String,
}

/// Display-ready result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    /// Media kind the result belongs to.
    pub kind: MediaKind,
    /// `Real` or `Fake`.
    pub verdict_label: &'static str,
    /// Kind-specific verdict headline.
    pub headline: &'static str,
    /// Confidence with two decimals and a percent sign.
    pub confidence_text: String,
    /// Confidence value for progress-bar style rendering.
    pub confidence_value: f64,
    /// `true` for fake verdicts, which render in the destructive style.
    pub destructive: bool,
    /// Kind-specific detail rows.
    pub details: Vec<DetailRow>,
    /// Frame timeline; empty for non-video results.
    pub timeline: Vec<FrameMarker>,
}

/// Projects `result` into a [`ResultView`].
pub fn present(result: &AnalysisResult) -> ResultView {
    let (details, timeline) = match &result.details {
        ResultDetails::Video(video) => (video_rows(video), frame_timeline(video)),
        ResultDetails::Image(image) => (image_rows(image), Vec::new()),
        ResultDetails::Audio(audio) => (audio_rows(audio), Vec::new()),
    };

    ResultView {
        kind: result.kind(),
        verdict_label: result.verdict.label(),
        headline: headline(result.kind(), result.verdict),
        confidence_text: result.confidence.to_string(),
        confidence_value: result.confidence.value(),
        destructive: result.verdict == Verdict::Fake,
        details,
        timeline,
    }
}

/// Kind-specific verdict headline.
pub fn headline(kind: MediaKind, verdict: Verdict) -> &'static str {
    match (kind, verdict) {
        (MediaKind::Video, Verdict::Fake) => "Likely Deepfake",
        (MediaKind::Video, Verdict::Real) => "Likely Authentic",
        (MediaKind::Image, Verdict::Fake) => "AI Generated Image",
        (MediaKind::Image, Verdict::Real) => "Natural Image",
        (MediaKind::Audio, Verdict::Fake) => "Synthetic Voice",
        (MediaKind::Audio, Verdict::Real) => "Authentic Voice",
        (MediaKind::Text, Verdict::Fake) => "Likely Generated Text",
        (MediaKind::Text, Verdict::Real) => "Likely Human Text",
    }
}

fn video_rows(video: &VideoDetails) -> Vec<DetailRow> {
    let mut rows = vec![
        DetailRow::new("Total Frames", video.total_frames.to_string()),
        DetailRow::new("Faces Detected", video.frames_with_faces.to_string()),
    ];
    if let Some(filename) = &video.filename {
        rows.push(DetailRow::new("File", filename.clone()));
    }
    rows
}

fn image_rows(image: &ImageDetails) -> Vec<DetailRow> {
    let face = if image.face_detected {
        "Detected"
    } else {
        "Not Found"
    };
    let mut rows = vec![DetailRow::new("Face Detection", face)];
    if let Some(dimensions) = image.dimensions {
        rows.push(DetailRow::new(
            "Image Size",
            format!("{}x{} pixels", dimensions.width, dimensions.height),
        ));
    }
    rows
}

fn audio_rows(audio: &AudioDetails) -> Vec<DetailRow> {
    let mut rows = vec![
        DetailRow::new("Segments Analyzed", audio.segments_analyzed.to_string()),
        DetailRow::new("Waveform Samples", audio.waveform.sample_count.to_string()),
        DetailRow::new("Peak Amplitude", format!("{:.3}", audio.waveform.peak)),
        DetailRow::new("RMS Amplitude", format!("{:.3}", audio.waveform.rms)),
    ];
    if audio.spectral.value_count > 0 {
        rows.push(DetailRow::new(
            "Spectral Range",
            format!("{:.2} to {:.2}", audio.spectral.min, audio.spectral.max),
        ));
    }
    if let Some(filename) = &audio.filename {
        rows.push(DetailRow::new("File", filename.clone()));
    }
    rows
}

fn frame_timeline(video: &VideoDetails) -> Vec<FrameMarker> {
    let count = video.frame_predictions.len();
    video
        .frame_predictions
        .iter()
        .enumerate()
        .map(|(index, frame)| FrameMarker {
            index,
            position_percent: index as f64 / count as f64 * 100.0,
            is_fake: frame.is_fake,
            opacity: frame.confidence,
            tooltip: format!(
                "Frame {index}: {:.1}% confidence",
                frame.confidence * 100.0
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    //! Unit tests for result presentation.

    use deepcheck_core::{Confidence, FramePrediction};

    use super::*;

    #[test]
    fn timeline_positions_follow_frame_index() {
        let result = AnalysisResult {
            verdict: Verdict::Fake,
            confidence: Confidence::new(70.0).expect("confidence should be valid"),
            details: ResultDetails::Video(VideoDetails {
                total_frames: 4,
                frame_predictions: vec![
                    FramePrediction {
                        is_fake: true,
                        confidence: 0.75,
                    };
                    4
                ],
                faces_detected: Vec::new(),
                frames_with_faces: 0,
                video_url: None,
                filename: None,
            }),
        };

        let view = present(&result);
        let positions: Vec<f64> = view
            .timeline
            .iter()
            .map(|marker| marker.position_percent)
            .collect();
        assert_eq!(positions, vec![0.0, 25.0, 50.0, 75.0]);
        assert_eq!(view.timeline[2].tooltip, "Frame 2: 75.0% confidence");
        assert_eq!(view.headline, "Likely Deepfake");
    }
}
