//! Shared fixtures for upload integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deepcheck_core::{CandidateFile, MediaKind, MediaValidator, SelectedFile};
use deepcheck_upload::{
    AnalysisTransport, ProgressSink, ProgressTracker, TransportResponse, UploadError,
    UploadRequest,
};

/// Image response the detection service returns for scenario fixtures.
#[allow(dead_code)]
pub const FAKE_IMAGE_BODY: &str =
    r#"{"result":"FAKE","confidence":87.456,"face_detected":true,"image_size":[512,512,3]}"#;

/// Accepted file of `size` bytes for `kind`.
#[allow(dead_code)]
pub fn selected(name: &str, mime_type: &str, kind: MediaKind, size: usize) -> SelectedFile {
    MediaValidator::default()
        .accept(CandidateFile::new(name, mime_type, vec![b'x'; size]), kind)
        .expect("fixture file should be accepted")
}

/// Progress sink recording every percentage it receives.
#[allow(dead_code)]
pub fn recording_sink() -> (Arc<Mutex<Vec<u8>>>, Arc<dyn ProgressSink>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink: Arc<dyn ProgressSink> = Arc::new(move |percent: u8| {
        sink_seen
            .lock()
            .expect("progress lock should work")
            .push(percent);
    });
    (seen, sink)
}

/// Transport answering every request with a fixed outcome.
#[allow(dead_code)]
pub struct ScriptedTransport {
    outcome: Result<TransportResponse, String>,
    requests: Mutex<Vec<UploadRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Answers with `status` and `body` after reporting the full body as sent.
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            outcome: Ok(TransportResponse {
                status,
                body: body.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every request with a transport error.
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<UploadRequest> {
        self.requests
            .lock()
            .expect("request lock should work")
            .clone()
    }
}

#[async_trait]
impl AnalysisTransport for ScriptedTransport {
    async fn send(
        &self,
        request: UploadRequest,
        mut progress: ProgressTracker,
    ) -> Result<TransportResponse, UploadError> {
        let size = request.bytes.len() as u64;
        self.requests
            .lock()
            .expect("request lock should work")
            .push(request);

        match &self.outcome {
            Ok(response) => {
                progress.record(size / 2);
                progress.record(size - size / 2);
                Ok(response.clone())
            }
            Err(message) => Err(UploadError::Transport(message.clone())),
        }
    }
}
