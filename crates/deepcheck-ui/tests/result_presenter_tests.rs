//! Integration tests for result presentation.

use deepcheck_core::{
    AnalysisResult, AudioDetails, Confidence, ImageDetails, ImageDimensions, MediaKind,
    ResultDetails, SpectralSummary, Verdict, WaveformSummary,
};
use deepcheck_ui::{DetailRow, present};

fn image_result(verdict: Verdict, confidence: f64, dimensions: Option<ImageDimensions>) -> AnalysisResult {
    AnalysisResult {
        verdict,
        confidence: Confidence::new(confidence).expect("confidence should be valid"),
        details: ResultDetails::Image(ImageDetails {
            face_detected: true,
            dimensions,
        }),
    }
}

#[test]
fn result_presenter_tests_fake_image_shows_rounded_confidence() {
    let result = image_result(
        Verdict::Fake,
        87.456,
        Some(ImageDimensions {
            height: 512,
            width: 512,
            channels: 3,
        }),
    );

    let view = present(&result);

    assert_eq!(view.kind, MediaKind::Image);
    assert_eq!(view.verdict_label, "Fake");
    assert_eq!(view.confidence_text, "87.46%");
    assert_eq!(view.headline, "AI Generated Image");
    assert!(view.destructive);
    assert!(view.timeline.is_empty());
    assert_eq!(
        view.details,
        vec![
            DetailRow {
                label: "Face Detection",
                value: "Detected".to_string(),
            },
            DetailRow {
                label: "Image Size",
                value: "512x512 pixels".to_string(),
            },
        ]
    );
}

#[test]
fn result_presenter_tests_image_size_is_width_by_height() {
    let result = image_result(
        Verdict::Real,
        12.0,
        Some(ImageDimensions {
            height: 480,
            width: 640,
            channels: 3,
        }),
    );

    let view = present(&result);

    assert_eq!(view.headline, "Natural Image");
    assert_eq!(view.confidence_text, "12.00%");
    assert!(!view.destructive);
    assert!(
        view.details
            .iter()
            .any(|row| row.label == "Image Size" && row.value == "640x480 pixels")
    );
}

#[test]
fn result_presenter_tests_audio_rows_include_segment_count() {
    let result = AnalysisResult {
        verdict: Verdict::Fake,
        confidence: Confidence::new(66.6).expect("confidence should be valid"),
        details: ResultDetails::Audio(AudioDetails {
            filename: Some("voicemail.wav".to_string()),
            waveform: WaveformSummary::from_samples(&[0.5, -1.0]),
            spectral: SpectralSummary::from_values(&[]),
            segments_analyzed: 9,
        }),
    };

    let view = present(&result);

    assert_eq!(view.headline, "Synthetic Voice");
    let labels: Vec<&str> = view.details.iter().map(|row| row.label).collect();
    assert_eq!(
        labels,
        vec![
            "Segments Analyzed",
            "Waveform Samples",
            "Peak Amplitude",
            "RMS Amplitude",
            "File"
        ]
    );
    assert_eq!(view.details[0].value, "9");
    assert_eq!(view.details[2].value, "1.000");
}
