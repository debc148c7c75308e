//! Aggregate submission state rendered by views.

use serde::Serialize;

use crate::{AnalysisResult, SelectedFile, SubmissionError, UploadProgress};

/// Phase of the submission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    /// Nothing selected.
    Idle,
    /// A validated file is held; a preview may be attached.
    FileSelected,
    /// An attempt is in flight.
    Uploading,
    /// The last attempt produced a result.
    Result,
    /// The last attempt failed.
    Failed,
}

impl SubmissionPhase {
    /// Returns `true` for phases that end an attempt.
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionPhase::Result | SubmissionPhase::Failed)
    }
}

/// Everything a view needs to render one upload surface.
///
/// Once the phase has left [`SubmissionPhase::Uploading`], exactly one of
/// `result` and `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionState {
    /// Current phase.
    pub phase: SubmissionPhase,
    /// Selected file, if any.
    pub file: Option<SelectedFile>,
    /// Upload percentage for the current attempt.
    pub progress: UploadProgress,
    /// `true` while uploading without a known byte total.
    pub progress_indeterminate: bool,
    /// Result of the last attempt.
    pub result: Option<AnalysisResult>,
    /// Failure of the last attempt.
    pub error: Option<SubmissionError>,
}

impl SubmissionState {
    /// The idle state: no file, zero progress, no outcome.
    pub fn idle() -> Self {
        Self {
            phase: SubmissionPhase::Idle,
            file: None,
            progress: UploadProgress::ZERO,
            progress_indeterminate: false,
            result: None,
            error: None,
        }
    }

    /// Returns `true` when the state equals [`SubmissionState::idle`].
    pub fn is_idle(&self) -> bool {
        *self == Self::idle()
    }
}

impl Default for SubmissionState {
    fn default() -> Self {
        Self::idle()
    }
}
