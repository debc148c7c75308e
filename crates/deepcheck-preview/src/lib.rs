#![warn(missing_docs)]
//! # deepcheck-preview
//!
//! ## Purpose
//! Owns the lifecycle of locally addressable preview URLs for selected files.
//!
//! ## Responsibilities
//! - Define a backend-agnostic [`PreviewStore`] with create/release as the only
//!   entry points.
//! - Provide an in-memory `blob:` store for embedding hosts and tests.
//! - Provide a temp-file store that exposes previews as `file://` URLs.
//! - Enforce single ownership through [`PreviewSlot`], which holds at most one
//!   live handle and releases it on replacement and on drop.
//!
//! ## Data flow
//! The submission controller passes a [`PreviewBlob`] view of the selected
//! file to [`PreviewSlot::replace`]; the slot releases the previous handle,
//! asks the store for a new one, and hands the URL to views.
//!
//! ## Ownership and lifetimes
//! [`PreviewHandle`] is deliberately not `Clone`. The slot is its only owner,
//! so a released handle cannot be read again.
//!
//! ## Error model
//! Creation failures return [`PreviewError`]. Release never fails: releasing
//! an unknown or already released handle is a no-op.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use deepcheck_core::{MediaKind, SelectedFile, file_extension};
use tempfile::TempDir;
use thiserror::Error;
use url::Url;

/// URL prefix minted by [`InMemoryPreviewStore`].
pub const BLOB_URL_PREFIX: &str = "blob:deepcheck/";

/// Borrowed view of the bytes a preview is created from.
#[derive(Debug, Clone, Copy)]
pub struct PreviewBlob<'a> {
    /// File contents.
    pub bytes: &'a Bytes,
    /// Normalized MIME type.
    pub mime_type: &'a str,
    /// Original file name.
    pub file_name: &'a str,
    /// Media kind the file was accepted for.
    pub kind: MediaKind,
}

impl<'a> From<&'a SelectedFile> for PreviewBlob<'a> {
    fn from(file: &'a SelectedFile) -> Self {
        Self {
            bytes: file.bytes(),
            mime_type: file.mime_type(),
            file_name: file.name(),
            kind: file.kind(),
        }
    }
}

/// Live preview URL issued by a [`PreviewStore`].
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: u64,
    url: String,
    kind: MediaKind,
    mime_type: String,
}

impl PreviewHandle {
    /// Store-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// URL a renderer can load.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Media kind, so a view can pick the right element.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Content type the preview should be rendered as.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Backend that mints and revokes preview URLs.
pub trait PreviewStore: Send + Sync {
    /// Creates a preview for `blob`.
    ///
    /// # Errors
    /// Returns [`PreviewError`] when the backend cannot materialize the bytes.
    fn create(&self, blob: PreviewBlob<'_>) -> Result<PreviewHandle, PreviewError>;

    /// Revokes `handle`. Idempotent; never fails.
    fn release(&self, handle: &PreviewHandle);

    /// Number of handles created and not yet released.
    fn outstanding(&self) -> usize;
}

/// Store keeping preview bytes in memory under `blob:` URLs.
#[derive(Debug, Default)]
pub struct InMemoryPreviewStore {
    registry: Mutex<Registry<Bytes>>,
}

#[derive(Debug)]
struct Registry<T> {
    next_id: u64,
    live: HashMap<u64, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            live: HashMap::new(),
        }
    }
}

impl InMemoryPreviewStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes behind a live `blob:` URL.
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        let id = url.strip_prefix(BLOB_URL_PREFIX)?.parse::<u64>().ok()?;
        self.registry.lock().ok()?.live.get(&id).cloned()
    }
}

impl PreviewStore for InMemoryPreviewStore {
    fn create(&self, blob: PreviewBlob<'_>) -> Result<PreviewHandle, PreviewError> {
        let mut registry = self.registry.lock().map_err(|_| PreviewError::Poisoned)?;
        let id = registry.next_id;
        registry.next_id += 1;
        registry.live.insert(id, blob.bytes.clone());

        Ok(PreviewHandle {
            id,
            url: format!("{BLOB_URL_PREFIX}{id}"),
            kind: blob.kind,
            mime_type: blob.mime_type.to_string(),
        })
    }

    fn release(&self, handle: &PreviewHandle) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.live.remove(&handle.id);
        }
    }

    fn outstanding(&self) -> usize {
        self.registry
            .lock()
            .map(|registry| registry.live.len())
            .unwrap_or(0)
    }
}

/// Store writing previews into a private temporary directory.
///
/// The directory and any files still in it are removed when the store drops.
#[derive(Debug)]
pub struct TempDirPreviewStore {
    dir: TempDir,
    registry: Mutex<Registry<PathBuf>>,
}

impl TempDirPreviewStore {
    /// Creates a store under the system temp directory.
    ///
    /// # Errors
    /// Returns [`PreviewError::Io`] when the directory cannot be created.
    pub fn new() -> Result<Self, PreviewError> {
        let dir = tempfile::Builder::new()
            .prefix("deepcheck-preview-")
            .tempdir()
            .map_err(|error| PreviewError::Io(format!("create preview dir: {error}")))?;

        Ok(Self {
            dir,
            registry: Mutex::new(Registry::default()),
        })
    }

    /// Directory holding live preview files.
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

impl PreviewStore for TempDirPreviewStore {
    fn create(&self, blob: PreviewBlob<'_>) -> Result<PreviewHandle, PreviewError> {
        let mut registry = self.registry.lock().map_err(|_| PreviewError::Poisoned)?;
        let id = registry.next_id;

        let file_name = match file_extension(blob.file_name) {
            Some(extension) => format!("preview-{id}.{extension}"),
            None => format!("preview-{id}"),
        };
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, blob.bytes)
            .map_err(|error| PreviewError::Io(format!("write {}: {error}", path.display())))?;

        let url = Url::from_file_path(&path)
            .map_err(|_| PreviewError::Io(format!("not an absolute path: {}", path.display())))?;

        registry.next_id += 1;
        registry.live.insert(id, path);

        Ok(PreviewHandle {
            id,
            url: url.to_string(),
            kind: blob.kind,
            mime_type: blob.mime_type.to_string(),
        })
    }

    fn release(&self, handle: &PreviewHandle) {
        let removed = match self.registry.lock() {
            Ok(mut registry) => registry.live.remove(&handle.id),
            Err(_) => None,
        };

        let Some(path) = removed else {
            return;
        };
        if let Err(error) = std::fs::remove_file(&path) {
            tracing::warn!(
                stage = "preview",
                action = "release",
                path = %path.display(),
                %error,
                "preview file could not be removed"
            );
        }
    }

    fn outstanding(&self) -> usize {
        self.registry
            .lock()
            .map(|registry| registry.live.len())
            .unwrap_or(0)
    }
}

/// Exclusive holder of at most one live preview.
pub struct PreviewSlot {
    store: Arc<dyn PreviewStore>,
    current: Option<PreviewHandle>,
}

impl PreviewSlot {
    /// Creates an empty slot over `store`.
    pub fn new(store: Arc<dyn PreviewStore>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Releases the current preview, then creates one for `blob`.
    ///
    /// # Errors
    /// Returns [`PreviewError`] when creation fails; the slot is then empty.
    pub fn replace(&mut self, blob: PreviewBlob<'_>) -> Result<&PreviewHandle, PreviewError> {
        self.release();
        let handle = self.store.create(blob)?;
        tracing::debug!(
            stage = "preview",
            action = "create",
            preview_id = handle.id,
            kind = %handle.kind,
            "preview created"
        );
        Ok(self.current.insert(handle))
    }

    /// Releases the current preview, if any.
    ///
    /// Returns `true` when a handle was released.
    pub fn release(&mut self) -> bool {
        match self.current.take() {
            Some(handle) => {
                self.store.release(&handle);
                tracing::debug!(
                    stage = "preview",
                    action = "release",
                    preview_id = handle.id,
                    "preview released"
                );
                true
            }
            None => false,
        }
    }

    /// Live handle, if any.
    pub fn current(&self) -> Option<&PreviewHandle> {
        self.current.as_ref()
    }

    /// URL of the live handle, if any.
    pub fn url(&self) -> Option<&str> {
        self.current.as_ref().map(PreviewHandle::url)
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PreviewSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSlot")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

/// Preview backend errors.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Filesystem failure while materializing a preview.
    #[error("preview io failure: {0}")]
    Io(String),
    /// Store registry lock was poisoned by a panicking thread.
    #[error("preview registry lock poisoned")]
    Poisoned,
}
