#![warn(missing_docs)]
//! # deepcheck-ui
//!
//! ## Purpose
//! Projects submission state and analysis results into display-ready values.
//!
//! ## Responsibilities
//! - Turn an [`deepcheck_core::AnalysisResult`] into a verdict label, a confidence string,
//!   and kind-specific detail rows ([`present`]).
//! - Project [`SubmissionState`] into what one upload surface renders,
//!   including progress and rotating loading copy ([`project_submission`]).
//! - Build the notification tuples emitted on completion, failure, and
//!   refused authorization.
//!
//! ## Data flow
//! The controller owns [`SubmissionState`]; renderers call
//! [`project_submission`] after every transition and draw the returned
//! [`SubmissionView`]. Notifications go to a [`NotificationSink`] chosen by
//! the host.
//!
//! ## Ownership and lifetimes
//! Views own their strings so they can outlive the state snapshot they came
//! from.
//!
//! ## Error model
//! Every projection is total: there is nothing to fail. Notification sinks
//! are fire-and-forget.
//!
//! ## Security and privacy notes
//! Views never contain file bytes; only names, sizes, and service output.

mod notify;
mod presenter;

use std::time::Duration;

use deepcheck_core::{MEBIBYTE, SubmissionPhase, SubmissionState};
use serde::Serialize;

pub use notify::{
    MemoryNotificationSink, Notification, NotificationSink, Severity, TracingNotificationSink,
    completion_notification, failure_notification, sign_in_notification,
};
pub use presenter::{DetailRow, FrameMarker, ResultView, headline, present};

/// Interval between loading message rotations.
pub const LOADING_ROTATION: Duration = Duration::from_secs(3);

const LOADING_MESSAGES: &[LoadingMessage] = &[
    LoadingMessage {
        headline: "Uploading your file",
        detail: "Sending it securely to the detection service.",
    },
    LoadingMessage {
        headline: "Looking for manipulation",
        detail: "Checking faces and textures for artifacts.",
    },
    LoadingMessage {
        headline: "Comparing against known fakes",
        detail: "Scoring each sample with the detection model.",
    },
    LoadingMessage {
        headline: "Almost there",
        detail: "Putting the verdict together.",
    },
];

/// Headline and sub-line shown while an attempt is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadingMessage {
    /// Primary line.
    pub headline: &'static str,
    /// Secondary line.
    pub detail: &'static str,
}

/// Loading copy for an attempt that has been running for `elapsed`.
pub fn loading_message(elapsed: Duration) -> LoadingMessage {
    let step = elapsed.as_millis() / LOADING_ROTATION.as_millis();
    LOADING_MESSAGES[(step % LOADING_MESSAGES.len() as u128) as usize]
}

/// Upload progress as rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    /// Percentage, or `None` while the byte total is unknown.
    pub percent: Option<u8>,
    /// Status line, e.g. `Uploading 42%`.
    pub text: String,
    /// Rotating loading copy.
    pub loading: LoadingMessage,
}

/// Everything one upload surface renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionView {
    /// Short phase label.
    pub phase_label: &'static str,
    /// Selected file name.
    pub file_name: Option<String>,
    /// Selected file size, e.g. `5.00 MB`.
    pub file_size_text: Option<String>,
    /// Whether the analyze action is enabled.
    pub can_start_analysis: bool,
    /// Whether the reset action is enabled.
    pub can_reset: bool,
    /// Progress, only while uploading.
    pub progress: Option<ProgressView>,
    /// Presented result, only in the result phase.
    pub result: Option<ResultView>,
    /// Failure message, only in the failed phase.
    pub error_text: Option<String>,
}

/// Projects `state` into a [`SubmissionView`].
///
/// `elapsed` is the time since the current attempt started and only selects
/// the loading copy.
pub fn project_submission(state: &SubmissionState, elapsed: Duration) -> SubmissionView {
    let progress = (state.phase == SubmissionPhase::Uploading).then(|| {
        let percent = (!state.progress_indeterminate).then(|| state.progress.percent());
        let text = match percent {
            Some(percent) => format!("Uploading {percent}%"),
            None => "Uploading...".to_string(),
        };
        ProgressView {
            percent,
            text,
            loading: loading_message(elapsed),
        }
    });

    // Outcomes left over from an earlier attempt stay hidden until the
    // current one ends.
    let terminal = state.phase.is_terminal();

    SubmissionView {
        phase_label: phase_label(state.phase),
        file_name: state.file.as_ref().map(|file| file.name().to_string()),
        file_size_text: state.file.as_ref().map(|file| format_size(file.size())),
        can_start_analysis: matches!(
            state.phase,
            SubmissionPhase::FileSelected | SubmissionPhase::Failed
        ) && state.file.is_some(),
        can_reset: state.phase != SubmissionPhase::Idle,
        progress,
        result: state
            .result
            .as_ref()
            .filter(|_| terminal)
            .map(present),
        error_text: state
            .error
            .as_ref()
            .filter(|_| terminal)
            .map(|error| error.message.clone()),
    }
}

/// Short label for a phase.
pub fn phase_label(phase: SubmissionPhase) -> &'static str {
    match phase {
        SubmissionPhase::Idle => "Choose a file",
        SubmissionPhase::FileSelected => "Ready to analyze",
        SubmissionPhase::Uploading => "Analyzing",
        SubmissionPhase::Result => "Analysis complete",
        SubmissionPhase::Failed => "Analysis failed",
    }
}

/// Formats a byte count in megabytes with two decimals.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MEBIBYTE as f64)
}
