//! Integration tests for normalizing contract fixtures into analysis results.

use deepcheck_analysis_contract::{
    AnalysisContractError, parse_analysis_response, parse_audio_response, parse_image_response,
    parse_video_response,
};
use deepcheck_core::{MediaKind, ResultDetails, Verdict};

const VIDEO_FIXTURE: &str =
    include_str!("../../../contracts/fixtures/video-analysis-response.valid.json");
const IMAGE_FIXTURE: &str =
    include_str!("../../../contracts/fixtures/image-analysis-response.valid.json");
const AUDIO_FIXTURE: &str =
    include_str!("../../../contracts/fixtures/audio-analysis-response.valid.json");
const INVALID_IMAGE_FIXTURE: &str =
    include_str!("../../../contracts/fixtures/image-analysis-response.invalid.json");

#[test]
fn response_normalization_tests_video_fixture_keeps_frame_order() {
    let result = parse_video_response(VIDEO_FIXTURE).expect("video fixture should parse");

    assert_eq!(result.verdict, Verdict::Fake);
    assert_eq!(result.confidence.value(), 78.31);
    assert_eq!(result.kind(), MediaKind::Video);

    let ResultDetails::Video(details) = result.details else {
        panic!("video fixture should produce video details");
    };
    assert_eq!(details.total_frames, 4);
    assert_eq!(details.frames_with_faces, 3);
    assert_eq!(details.filename.as_deref(), Some("interview.mp4"));
    let flags: Vec<bool> = details
        .frame_predictions
        .iter()
        .map(|frame| frame.is_fake)
        .collect();
    assert_eq!(flags, vec![true, true, false, true]);
}

#[test]
fn response_normalization_tests_image_fixture_rounds_confidence() {
    let result = parse_image_response(IMAGE_FIXTURE).expect("image fixture should parse");

    assert_eq!(result.verdict, Verdict::Fake);
    assert_eq!(result.confidence.to_string(), "87.46%");
    let ResultDetails::Image(details) = result.details else {
        panic!("image fixture should produce image details");
    };
    assert!(details.face_detected);
    let dimensions = details.dimensions.expect("image_size should be present");
    assert_eq!((dimensions.width, dimensions.height), (512, 512));
}

#[test]
fn response_normalization_tests_audio_fixture_flattens_features() {
    let result = parse_audio_response(AUDIO_FIXTURE).expect("audio fixture should parse");

    assert_eq!(result.verdict, Verdict::Real);
    assert_eq!(result.confidence.value(), 91.21);
    let ResultDetails::Audio(details) = result.details else {
        panic!("audio fixture should produce audio details");
    };
    assert_eq!(details.segments_analyzed, 12);
    assert_eq!(details.waveform.sample_count, 5);
    assert_eq!(details.spectral.value_count, 4);
    assert_eq!(details.spectral.max, 3.0);
}

#[test]
fn response_normalization_tests_invalid_fixture_is_contract_violation() {
    assert!(matches!(
        parse_image_response(INVALID_IMAGE_FIXTURE),
        Err(AnalysisContractError::InvalidContract(_))
    ));
}

#[test]
fn response_normalization_tests_missing_mandatory_field_is_decode_error() {
    assert!(matches!(
        parse_image_response(r#"{"result":"REAL"}"#),
        Err(AnalysisContractError::Decode(_))
    ));
    assert!(matches!(
        parse_video_response("not json"),
        Err(AnalysisContractError::Decode(_))
    ));
}

#[test]
fn response_normalization_tests_text_has_no_contract() {
    assert!(matches!(
        parse_analysis_response(MediaKind::Text, IMAGE_FIXTURE),
        Err(AnalysisContractError::UnsupportedKind(MediaKind::Text))
    ));
}
