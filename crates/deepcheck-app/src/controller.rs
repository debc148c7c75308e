//! Submission state machine for one upload surface.
//!
//! The controller is the only writer of [`SubmissionState`]. Every attempt
//! gets a fresh [`AttemptToken`]; events carrying any other token are
//! discarded, which is how superseded uploads are cancelled.

use std::fmt;
use std::sync::Arc;

use deepcheck_auth::{AuthorizationGate, SignInRedirect};
use deepcheck_core::{
    AnalysisResult, CandidateFile, MediaKind, MediaValidator, SelectedFile, SubmissionError,
    SubmissionPhase, SubmissionState, ValidationRejected,
};
use deepcheck_preview::{PreviewBlob, PreviewError, PreviewHandle, PreviewSlot, PreviewStore};
use deepcheck_ui::{
    NotificationSink, completion_notification, failure_notification, sign_in_notification,
};
use thiserror::Error;

use crate::redact_sensitive;

/// Identifier of one analysis attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptToken(u64);

impl AttemptToken {
    /// Raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

/// Everything a driver needs to run one attempt.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    /// Token every event of this attempt must carry.
    pub token: AttemptToken,
    /// File to upload. Shares bytes with the controller's copy.
    pub file: SelectedFile,
}

/// Event reported by an in-flight attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptEvent {
    /// Upload percentage.
    Progress(u8),
    /// Service returned a normalized result.
    Succeeded(AnalysisResult),
    /// Attempt failed.
    Failed(SubmissionError),
}

/// Whether an event changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Event belonged to the current attempt and was applied.
    Applied,
    /// Event belonged to a superseded or finished attempt and was ignored.
    Stale,
}

/// Owner of one upload surface's state, preview, and attempt identity.
pub struct SubmissionController {
    state: SubmissionState,
    preview: PreviewSlot,
    validator: MediaValidator,
    current: Option<AttemptToken>,
    next_token: u64,
    notifier: Arc<dyn NotificationSink>,
    redirect: Arc<dyn SignInRedirect>,
}

impl SubmissionController {
    /// Creates an idle controller.
    pub fn new(
        validator: MediaValidator,
        previews: Arc<dyn PreviewStore>,
        notifier: Arc<dyn NotificationSink>,
        redirect: Arc<dyn SignInRedirect>,
    ) -> Self {
        Self {
            state: SubmissionState::idle(),
            preview: PreviewSlot::new(previews),
            validator,
            current: None,
            next_token: 1,
            notifier,
            redirect,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> SubmissionPhase {
        self.state.phase
    }

    /// Live preview, if any.
    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.current()
    }

    /// URL of the live preview, if any.
    pub fn preview_url(&self) -> Option<&str> {
        self.preview.url()
    }

    /// Token of the in-flight attempt, if any.
    pub fn current_attempt(&self) -> Option<AttemptToken> {
        self.current
    }

    /// Validates `candidate` for `kind` and selects it.
    ///
    /// A rejected candidate leaves state untouched in every phase. An accepted
    /// one first resets any previous selection, result, failure, or in-flight
    /// attempt, then attaches a fresh preview.
    ///
    /// # Errors
    /// Returns [`ControllerError::Rejected`] when validation fails.
    pub fn select_file(
        &mut self,
        candidate: CandidateFile,
        kind: MediaKind,
    ) -> Result<(), ControllerError> {
        let name = candidate.name.clone();
        let file = self.validator.accept(candidate, kind).map_err(|reason| {
            tracing::info!(
                stage = "controller",
                action = "select_file",
                %kind,
                file_name = %name,
                %reason,
                "file rejected"
            );
            ControllerError::Rejected(reason)
        })?;

        if self.state.phase != SubmissionPhase::Idle {
            self.clear("select_file");
        }

        tracing::info!(
            stage = "controller",
            action = "select_file",
            %kind,
            size = file.size(),
            fingerprint = %file.fingerprint(),
            "file selected"
        );
        self.state.phase = SubmissionPhase::FileSelected;
        self.state.file = Some(file);
        self.attach_preview();
        Ok(())
    }

    /// Re-creates the preview for the selected file.
    ///
    /// The previous preview is released before the new one is created.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidTransition`] outside
    /// [`SubmissionPhase::FileSelected`] and [`ControllerError::Preview`] when
    /// the store fails.
    pub fn request_preview(&mut self) -> Result<&PreviewHandle, ControllerError> {
        self.require_phase("request_preview", &[SubmissionPhase::FileSelected])?;
        let file = self
            .state
            .file
            .as_ref()
            .ok_or(ControllerError::NoFileSelected)?;
        Ok(self.preview.replace(PreviewBlob::from(file))?)
    }

    /// Swaps the selected file for an edited version, such as a cropped image.
    ///
    /// The edit is validated against the current kind. On success the preview
    /// is rebuilt from the new bytes; on rejection nothing changes.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidTransition`] outside
    /// [`SubmissionPhase::FileSelected`] and [`ControllerError::Rejected`] when
    /// the edit fails validation.
    pub fn replace_with_edited(&mut self, edited: CandidateFile) -> Result<(), ControllerError> {
        self.require_phase("replace_with_edited", &[SubmissionPhase::FileSelected])?;
        let kind = self
            .state
            .file
            .as_ref()
            .map(SelectedFile::kind)
            .ok_or(ControllerError::NoFileSelected)?;

        let file = self.validator.accept(edited, kind)?;
        tracing::info!(
            stage = "controller",
            action = "replace_with_edited",
            %kind,
            size = file.size(),
            fingerprint = %file.fingerprint(),
            "selected file replaced by edit"
        );
        self.state.file = Some(file);
        self.attach_preview();
        Ok(())
    }

    /// Starts an attempt if the gate allows it.
    ///
    /// Legal from [`SubmissionPhase::FileSelected`] and, for a retry with the
    /// kept file, from [`SubmissionPhase::Failed`]. When the gate refuses, the
    /// sign-in redirect fires, a notification is emitted, and state is left
    /// as it was.
    ///
    /// # Errors
    /// Returns [`ControllerError::Unauthorized`] when the gate refuses and
    /// [`ControllerError::InvalidTransition`] from any other phase.
    pub fn start_analysis(
        &mut self,
        gate: &dyn AuthorizationGate,
    ) -> Result<AnalysisTicket, ControllerError> {
        self.require_phase(
            "start_analysis",
            &[SubmissionPhase::FileSelected, SubmissionPhase::Failed],
        )?;
        let file = self
            .state
            .file
            .clone()
            .ok_or(ControllerError::NoFileSelected)?;

        if !gate.is_authorized() {
            tracing::warn!(
                stage = "controller",
                action = "start_analysis",
                kind = %file.kind(),
                "analysis refused without a session"
            );
            self.redirect.redirect_to_sign_in();
            self.notifier.notify(sign_in_notification(file.kind()));
            return Err(ControllerError::Unauthorized);
        }

        let token = AttemptToken(self.next_token);
        self.next_token += 1;
        self.current = Some(token);

        self.state.phase = SubmissionPhase::Uploading;
        self.state.progress.reset();
        self.state.progress_indeterminate = true;
        self.state.result = None;
        self.state.error = None;

        tracing::info!(
            stage = "controller",
            action = "start_analysis",
            token = %token,
            kind = %file.kind(),
            size = file.size(),
            fingerprint = %file.fingerprint(),
            "analysis started"
        );
        Ok(AnalysisTicket { token, file })
    }

    /// Applies an attempt event if `token` is the in-flight attempt.
    pub fn apply(&mut self, token: AttemptToken, event: AttemptEvent) -> EventOutcome {
        if self.current != Some(token) || self.state.phase != SubmissionPhase::Uploading {
            tracing::debug!(
                stage = "controller",
                action = "apply",
                token = %token,
                "stale attempt event discarded"
            );
            return EventOutcome::Stale;
        }

        match event {
            AttemptEvent::Progress(percent) => {
                self.state.progress.advance(percent);
                self.state.progress_indeterminate = false;
            }
            AttemptEvent::Succeeded(result) => {
                tracing::info!(
                    stage = "controller",
                    action = "complete",
                    token = %token,
                    verdict = result.verdict.as_wire(),
                    confidence = result.confidence.value(),
                    "analysis complete"
                );
                self.notifier.notify(completion_notification(&result));
                self.current = None;
                self.state.phase = SubmissionPhase::Result;
                self.state.progress.complete();
                self.state.progress_indeterminate = false;
                self.state.result = Some(result);
            }
            AttemptEvent::Failed(error) => {
                tracing::warn!(
                    stage = "controller",
                    action = "fail",
                    token = %token,
                    failure = %error.kind,
                    message = %redact_sensitive(&error.message),
                    "analysis failed"
                );
                self.notifier.notify(failure_notification(&error));
                self.current = None;
                self.state.phase = SubmissionPhase::Failed;
                self.state.progress_indeterminate = false;
                self.state.error = Some(error);
            }
        }
        EventOutcome::Applied
    }

    /// Applies a progress event.
    pub fn on_progress(&mut self, token: AttemptToken, percent: u8) -> EventOutcome {
        self.apply(token, AttemptEvent::Progress(percent))
    }

    /// Applies a success event.
    pub fn on_success(&mut self, token: AttemptToken, result: AnalysisResult) -> EventOutcome {
        self.apply(token, AttemptEvent::Succeeded(result))
    }

    /// Applies a failure event.
    pub fn on_failure(&mut self, token: AttemptToken, error: SubmissionError) -> EventOutcome {
        self.apply(token, AttemptEvent::Failed(error))
    }

    /// Returns to idle from any phase.
    ///
    /// Releases the preview and abandons any in-flight attempt; its later
    /// events are reported as [`EventOutcome::Stale`].
    pub fn reset(&mut self) {
        self.clear("reset");
    }

    fn clear(&mut self, action: &'static str) {
        let abandoned = self.current.take();
        let released = self.preview.release();
        self.state = SubmissionState::idle();
        tracing::info!(
            stage = "controller",
            action,
            abandoned = abandoned.map(AttemptToken::get),
            preview_released = released,
            "submission cleared"
        );
    }

    fn attach_preview(&mut self) {
        let Some(file) = self.state.file.as_ref() else {
            return;
        };
        if let Err(error) = self.preview.replace(PreviewBlob::from(file)) {
            // The selection stands without a preview; request_preview may retry.
            tracing::warn!(
                stage = "controller",
                action = "preview",
                %error,
                "preview could not be created"
            );
        }
    }

    fn require_phase(
        &self,
        action: &'static str,
        allowed: &[SubmissionPhase],
    ) -> Result<(), ControllerError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(ControllerError::InvalidTransition {
                action,
                phase: self.state.phase,
            })
        }
    }
}

impl fmt::Debug for SubmissionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionController")
            .field("state", &self.state)
            .field("preview", &self.preview)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

/// Controller intent errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Candidate failed validation; state is unchanged.
    #[error("file rejected: {0}")]
    Rejected(#[from] ValidationRejected),
    /// Authorization gate refused; no request was made.
    #[error("sign in required before analysis")]
    Unauthorized,
    /// Intent is not legal in the current phase.
    #[error("{action} is not allowed while {phase:?}")]
    InvalidTransition {
        /// Requested intent.
        action: &'static str,
        /// Phase at the time of the request.
        phase: SubmissionPhase,
    },
    /// Intent needs a selected file and none is held.
    #[error("no file selected")]
    NoFileSelected,
    /// Preview store failure.
    #[error(transparent)]
    Preview(#[from] PreviewError),
}

#[cfg(test)]
mod tests {
    //! Unit tests for attempt bookkeeping.

    use deepcheck_auth::StaticGate;
    use deepcheck_preview::InMemoryPreviewStore;
    use deepcheck_ui::MemoryNotificationSink;

    use super::*;

    struct NoRedirect;

    impl SignInRedirect for NoRedirect {
        fn redirect_to_sign_in(&self) {}
    }

    fn controller() -> SubmissionController {
        SubmissionController::new(
            MediaValidator::default(),
            Arc::new(InMemoryPreviewStore::new()),
            Arc::new(MemoryNotificationSink::new()),
            Arc::new(NoRedirect),
        )
    }

    #[test]
    fn retry_issues_fresh_token() {
        let mut controller = controller();
        controller
            .select_file(
                CandidateFile::new("clip.mp4", "video/mp4", vec![1_u8; 16]),
                MediaKind::Video,
            )
            .expect("video should be accepted");

        let first = controller
            .start_analysis(&StaticGate(true))
            .expect("first attempt should start");
        controller.on_failure(first.token, SubmissionError::network_failure("offline"));
        let second = controller
            .start_analysis(&StaticGate(true))
            .expect("retry should start from failed");

        assert!(second.token > first.token);
        assert_eq!(controller.on_progress(first.token, 10), EventOutcome::Stale);
        assert_eq!(controller.on_progress(second.token, 10), EventOutcome::Applied);
    }

    #[test]
    fn progress_is_monotonic_within_attempt() {
        let mut controller = controller();
        controller
            .select_file(
                CandidateFile::new("clip.mp4", "video/mp4", vec![1_u8; 16]),
                MediaKind::Video,
            )
            .expect("video should be accepted");
        let ticket = controller
            .start_analysis(&StaticGate(true))
            .expect("attempt should start");

        assert!(controller.state().progress_indeterminate);
        controller.on_progress(ticket.token, 60);
        controller.on_progress(ticket.token, 30);

        assert_eq!(controller.state().progress.percent(), 60);
        assert!(!controller.state().progress_indeterminate);
    }
}
