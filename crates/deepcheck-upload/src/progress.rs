//! Byte-counted upload progress.

use std::sync::Arc;

/// Receiver of integer upload percentages.
pub trait ProgressSink: Send + Sync {
    /// Called with a percentage in `[0, 100]`.
    fn on_progress(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent)
    }
}

/// Converts transport byte counters into percentages for one attempt.
///
/// Emits `floor(sent * 100 / total)` whenever that value changes. Nothing is
/// emitted when the total is unknown or zero.
pub struct ProgressTracker {
    total: Option<u64>,
    sent: u64,
    last: Option<u8>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressTracker {
    /// Creates a tracker for a body of `total` bytes.
    pub fn new(total: Option<u64>, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            total: total.filter(|total| *total > 0),
            sent: 0,
            last: None,
            sink,
        }
    }

    /// Returns `true` when percentages can be computed.
    pub fn is_determinate(&self) -> bool {
        self.total.is_some()
    }

    /// Bytes recorded so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Records `bytes` handed to the transport.
    pub fn record(&mut self, bytes: u64) {
        self.sent = self.sent.saturating_add(bytes);
        let Some(total) = self.total else {
            return;
        };

        let percent = (u128::from(self.sent.min(total)) * 100 / u128::from(total)) as u8;
        if self.last.is_none_or(|last| percent > last) {
            self.last = Some(percent);
            self.sink.on_progress(percent);
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total", &self.total)
            .field("sent", &self.sent)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
