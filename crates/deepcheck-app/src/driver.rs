//! Async attempt driver.
//!
//! Uploads run on spawned tasks and report back over a channel. The session
//! applies events one at a time on the caller's task, so the controller is
//! never touched concurrently.

use std::sync::Arc;

use deepcheck_auth::AuthorizationGate;
use deepcheck_core::{SubmissionError, SubmissionState};
use deepcheck_upload::{AnalysisClient, ProgressSink};
use tokio::sync::mpsc;

use crate::controller::{
    AttemptEvent, AttemptToken, ControllerError, EventOutcome, SubmissionController,
};

/// Event tagged with the attempt that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptMessage {
    /// Producing attempt.
    pub token: AttemptToken,
    /// Reported event.
    pub event: AttemptEvent,
}

/// Controller plus the client and event queue that feed it.
#[derive(Debug)]
pub struct SubmissionSession {
    controller: SubmissionController,
    client: AnalysisClient,
    events_tx: mpsc::UnboundedSender<AttemptMessage>,
    events_rx: mpsc::UnboundedReceiver<AttemptMessage>,
}

impl SubmissionSession {
    /// Creates a session around `controller`.
    pub fn new(controller: SubmissionController, client: AnalysisClient) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            client,
            events_tx,
            events_rx,
        }
    }

    /// Read access to the controller.
    pub fn controller(&self) -> &SubmissionController {
        &self.controller
    }

    /// Write access for user intents such as selection and reset.
    pub fn controller_mut(&mut self) -> &mut SubmissionController {
        &mut self.controller
    }

    /// Starts an attempt and spawns its upload.
    ///
    /// Must be called from within a Tokio runtime. Progress events are queued
    /// before the terminal event, so the terminal event is always the last one
    /// an attempt produces. An upload task that panics is reported as an
    /// unknown failure, so every attempt ends with a terminal event.
    ///
    /// # Errors
    /// Propagates [`SubmissionController::start_analysis`] errors; nothing is
    /// spawned in that case.
    pub fn start(&mut self, gate: &dyn AuthorizationGate) -> Result<AttemptToken, ControllerError> {
        let ticket = self.controller.start_analysis(gate)?;
        let token = ticket.token;
        let client = self.client.clone();
        let events = self.events_tx.clone();
        let join_events = self.events_tx.clone();

        let upload = tokio::spawn(async move {
            let progress_events = events.clone();
            let sink: Arc<dyn ProgressSink> = Arc::new(move |percent: u8| {
                // A closed queue means the session is gone; the event has no reader.
                let _ = progress_events.send(AttemptMessage {
                    token,
                    event: AttemptEvent::Progress(percent),
                });
            });

            let event = match client.submit(&ticket.file, sink).await {
                Ok(result) => AttemptEvent::Succeeded(result),
                Err(error) => AttemptEvent::Failed(error),
            };
            let _ = events.send(AttemptMessage { token, event });
        });

        tokio::spawn(async move {
            let Err(error) = upload.await else {
                return;
            };
            tracing::error!(
                stage = "driver",
                action = "join",
                token = %token,
                %error,
                "upload task ended without a result"
            );
            let _ = join_events.send(AttemptMessage {
                token,
                event: AttemptEvent::Failed(SubmissionError::unknown(
                    "analysis ended unexpectedly, please try again",
                )),
            });
        });

        Ok(token)
    }

    /// Waits for the next queued event and applies it.
    ///
    /// Returns the event's token and whether it changed state. The session
    /// keeps a sender of its own, so `None` only follows a closed receiver.
    pub async fn next_event(&mut self) -> Option<(AttemptToken, EventOutcome)> {
        let message = self.events_rx.recv().await?;
        let outcome = self.controller.apply(message.token, message.event);
        Some((message.token, outcome))
    }

    /// Applies events until no attempt is in flight.
    ///
    /// Events from superseded attempts that arrive meanwhile are discarded.
    pub async fn run_to_completion(&mut self) -> &SubmissionState {
        while self.controller.current_attempt().is_some() {
            if self.next_event().await.is_none() {
                break;
            }
        }
        self.controller.state()
    }
}
