//! Shared fixtures for app integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use deepcheck_app::SubmissionController;
use deepcheck_auth::SignInRedirect;
use deepcheck_core::{CandidateFile, MediaValidator};
use deepcheck_preview::{
    InMemoryPreviewStore, PreviewBlob, PreviewError, PreviewHandle, PreviewStore,
};
use deepcheck_ui::{MemoryNotificationSink, NotificationSink};
use deepcheck_upload::{
    AnalysisClient, AnalysisEndpoints, AnalysisTransport, ProgressTracker, TransportResponse,
    UploadError, UploadRequest,
};
use tokio::sync::Notify;

/// Image response used by success scenarios.
#[allow(dead_code)]
pub const FAKE_IMAGE_BODY: &str =
    r#"{"result":"FAKE","confidence":87.456,"face_detected":true,"image_size":[512,512,3]}"#;

/// Candidate of `size` bytes.
#[allow(dead_code)]
pub fn candidate(name: &str, mime_type: &str, size: usize) -> CandidateFile {
    CandidateFile::new(name, mime_type, vec![b'x'; size])
}

/// Redirect counting how often sign-in was requested.
#[derive(Debug, Default)]
pub struct CountingRedirect {
    count: AtomicUsize,
}

#[allow(dead_code)]
impl CountingRedirect {
    /// Number of redirects so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl SignInRedirect for CountingRedirect {
    fn redirect_to_sign_in(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory preview store that counts releases.
#[derive(Debug, Default)]
pub struct CountingPreviewStore {
    inner: InMemoryPreviewStore,
    releases: AtomicUsize,
}

#[allow(dead_code)]
impl CountingPreviewStore {
    /// Number of release calls so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Handles created and not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding()
    }
}

impl PreviewStore for CountingPreviewStore {
    fn create(&self, blob: PreviewBlob<'_>) -> Result<PreviewHandle, PreviewError> {
        self.inner.create(blob)
    }

    fn release(&self, handle: &PreviewHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release(handle);
    }

    fn outstanding(&self) -> usize {
        self.inner.outstanding()
    }
}

/// Controller plus handles to its collaborators.
#[allow(dead_code)]
pub struct Harness {
    /// Controller under test.
    pub controller: SubmissionController,
    /// Preview store the controller writes to.
    pub previews: Arc<CountingPreviewStore>,
    /// Notifications the controller emitted.
    pub notifications: Arc<MemoryNotificationSink>,
    /// Sign-in redirect side-channel.
    pub redirect: Arc<CountingRedirect>,
}

/// Builds an idle controller with default size limits.
#[allow(dead_code)]
pub fn harness() -> Harness {
    let previews = Arc::new(CountingPreviewStore::default());
    let notifications = Arc::new(MemoryNotificationSink::new());
    let redirect = Arc::new(CountingRedirect::default());
    let controller = SubmissionController::new(
        MediaValidator::default(),
        Arc::clone(&previews) as Arc<dyn PreviewStore>,
        Arc::clone(&notifications) as Arc<dyn NotificationSink>,
        Arc::clone(&redirect) as Arc<dyn SignInRedirect>,
    );

    Harness {
        controller,
        previews,
        notifications,
        redirect,
    }
}

/// Client pointed at `base` over `transport`.
#[allow(dead_code)]
pub fn client(base: &str, transport: Arc<dyn AnalysisTransport>) -> AnalysisClient {
    let endpoints = AnalysisEndpoints::from_base(base).expect("base should be valid");
    AnalysisClient::new(endpoints, transport)
}

/// Transport answering with a fixed body; files named `slow*` wait for
/// [`GatedTransport::release`] first.
#[allow(dead_code)]
pub struct GatedTransport {
    body: String,
    gate: Notify,
    requests: AtomicUsize,
}

#[allow(dead_code)]
impl GatedTransport {
    /// Creates a transport answering `200` with `body`.
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            gate: Notify::new(),
            requests: AtomicUsize::new(0),
        }
    }

    /// Lets one waiting `slow*` request finish.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Number of requests received.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisTransport for GatedTransport {
    async fn send(
        &self,
        request: UploadRequest,
        mut progress: ProgressTracker,
    ) -> Result<TransportResponse, UploadError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if request.file_name.starts_with("slow") {
            self.gate.notified().await;
        }
        progress.record(request.bytes.len() as u64);
        Ok(TransportResponse {
            status: 200,
            body: self.body.clone(),
        })
    }
}

/// Transport whose upload task panics mid-request.
#[allow(dead_code)]
pub struct PanickingTransport;

#[async_trait]
impl AnalysisTransport for PanickingTransport {
    async fn send(
        &self,
        _request: UploadRequest,
        _progress: ProgressTracker,
    ) -> Result<TransportResponse, UploadError> {
        panic!("transport blew up");
    }
}
