//! Toast-style notifications emitted by the controller.

use std::sync::Mutex;

use deepcheck_core::{AnalysisResult, MediaKind, SubmissionError, Verdict, redact_sensitive};
use serde::Serialize;

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Neutral styling.
    Default,
    /// Error or warning styling.
    Destructive,
}

/// `(title, description, severity)` tuple for an external toast system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Bold first line.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Styling hint.
    pub severity: Severity,
}

/// Fire-and-forget receiver of notifications.
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification. Must not block.
    fn notify(&self, notification: Notification);
}

/// Sink that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationSink {
    received: Mutex<Vec<Notification>>,
}

impl MemoryNotificationSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for MemoryNotificationSink {
    fn notify(&self, notification: Notification) {
        if let Ok(mut received) = self.received.lock() {
            received.push(notification);
        }
    }
}

/// Sink that writes notifications to the log.
///
/// Failure descriptions carry service error text, so the description is
/// passed through [`redact_sensitive`] before it is logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notification: Notification) {
        let description = redact_sensitive(&notification.description);
        match notification.severity {
            Severity::Default => tracing::info!(
                stage = "notify",
                title = %notification.title,
                %description,
                "notification"
            ),
            Severity::Destructive => tracing::warn!(
                stage = "notify",
                title = %notification.title,
                %description,
                "notification"
            ),
        }
    }
}

/// Notification for a completed analysis.
///
/// Fake verdicts use [`Severity::Destructive`].
pub fn completion_notification(result: &AnalysisResult) -> Notification {
    Notification {
        title: format!("{} Analysis Complete", result.kind().label()),
        description: format!(
            "Result: {} ({} confidence)",
            result.verdict.as_wire(),
            result.confidence
        ),
        severity: match result.verdict {
            Verdict::Fake => Severity::Destructive,
            Verdict::Real => Severity::Default,
        },
    }
}

/// Notification for a failed attempt.
pub fn failure_notification(error: &SubmissionError) -> Notification {
    Notification {
        title: "Analysis Failed".to_string(),
        description: error.message.clone(),
        severity: Severity::Destructive,
    }
}

/// Notification for an analysis refused by the authorization gate.
pub fn sign_in_notification(kind: MediaKind) -> Notification {
    let noun = match kind {
        MediaKind::Video => "videos",
        MediaKind::Image => "images",
        MediaKind::Audio => "audio files",
        MediaKind::Text => "documents",
    };
    Notification {
        title: "Sign in required".to_string(),
        description: format!("Please sign in to analyze {noun}"),
        severity: Severity::Destructive,
    }
}
