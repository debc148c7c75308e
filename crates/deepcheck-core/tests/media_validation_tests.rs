//! Integration tests for media acceptance rules.

use deepcheck_core::{
    CandidateFile, MEBIBYTE, MediaKind, MediaValidator, SizeLimits, ValidationRejected,
    mime_matches_kind,
};

#[test]
fn media_validation_tests_accepts_png_under_image_ceiling() {
    let validator = MediaValidator::default();
    let candidate = CandidateFile::new("portrait.png", "image/png", vec![7_u8; 5 * MEBIBYTE as usize]);

    let selected = validator
        .accept(candidate, MediaKind::Image)
        .expect("5 MB png should be accepted");
    assert_eq!(selected.kind(), MediaKind::Image);
    assert_eq!(selected.size(), 5 * MEBIBYTE);
    assert_eq!(selected.mime_type(), "image/png");
}

#[test]
fn media_validation_tests_rejects_video_offered_as_image() {
    let validator = MediaValidator::default();
    let candidate = CandidateFile::new("clip.mp4", "video/mp4", vec![0_u8; 30 * MEBIBYTE as usize]);

    let rejected = validator
        .validate(&candidate, MediaKind::Image)
        .expect_err("video should not pass as image");
    assert!(matches!(rejected, ValidationRejected::MimeMismatch { .. }));
}

#[test]
fn media_validation_tests_accepted_files_respect_limits_and_family() {
    let limits = SizeLimits::default().with_max_bytes(MediaKind::Audio, 64);
    let validator = MediaValidator::new(limits);
    let mime_types = ["audio/wav", "audio/mpeg", "video/webm", "image/gif", "text/plain", ""];

    for kind in MediaKind::ALL {
        for mime_type in mime_types {
            for size in [0_usize, 1, 63, 64, 65] {
                let candidate = CandidateFile::new("sample.txt", mime_type, vec![1_u8; size]);
                if let Ok(selected) = validator.accept(candidate, kind) {
                    assert!(selected.size() <= limits.max_bytes(kind));
                    assert!(mime_matches_kind(selected.mime_type(), kind));
                }
            }
        }
    }
}
