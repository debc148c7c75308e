//! Integration tests for submission state projection.

use std::time::Duration;

use deepcheck_core::{
    CandidateFile, MEBIBYTE, MediaKind, MediaValidator, SubmissionError, SubmissionPhase,
    SubmissionState, UploadProgress,
};
use deepcheck_ui::project_submission;

fn state_with_file(phase: SubmissionPhase) -> SubmissionState {
    let file = MediaValidator::default()
        .accept(
            CandidateFile::new("clip.mp4", "video/mp4", vec![0_u8; (5 * MEBIBYTE) as usize]),
            MediaKind::Video,
        )
        .expect("fixture file should be accepted");
    SubmissionState {
        phase,
        file: Some(file),
        ..SubmissionState::idle()
    }
}

#[test]
fn submission_view_tests_uploading_shows_percentage() {
    let mut state = state_with_file(SubmissionPhase::Uploading);
    state.progress = UploadProgress::ZERO;
    state.progress.advance(42);

    let view = project_submission(&state, Duration::from_secs(4));
    let progress = view.progress.expect("uploading should project progress");

    assert_eq!(progress.percent, Some(42));
    assert_eq!(progress.text, "Uploading 42%");
    assert!(!view.can_start_analysis);
    assert!(view.can_reset);
    assert_eq!(view.file_size_text.as_deref(), Some("5.00 MB"));
}

#[test]
fn submission_view_tests_unknown_total_is_indeterminate() {
    let mut state = state_with_file(SubmissionPhase::Uploading);
    state.progress_indeterminate = true;

    let view = project_submission(&state, Duration::ZERO);
    let progress = view.progress.expect("uploading should project progress");

    assert_eq!(progress.percent, None);
    assert_eq!(progress.text, "Uploading...");
}

#[test]
fn submission_view_tests_failed_state_allows_retry() {
    let mut state = state_with_file(SubmissionPhase::Failed);
    state.error = Some(SubmissionError::network_failure("connection refused"));

    let view = project_submission(&state, Duration::ZERO);

    assert_eq!(view.phase_label, "Analysis failed");
    assert!(view.can_start_analysis);
    assert_eq!(view.error_text.as_deref(), Some("connection refused"));
    assert!(view.result.is_none());
}

#[test]
fn submission_view_tests_earlier_outcome_hidden_while_uploading() {
    let mut state = state_with_file(SubmissionPhase::Uploading);
    state.error = Some(SubmissionError::network_failure("connection refused"));

    let view = project_submission(&state, Duration::ZERO);

    assert!(view.progress.is_some());
    assert!(view.error_text.is_none());
    assert!(view.result.is_none());
}
