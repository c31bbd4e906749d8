//! # contract: the network seams of the deployer
//!
//! Two traits separate pipeline logic from transport:
//!
//! - [`ContentApi`] uploads sandboxes, shared file sets, thumbnails and
//!   playlists to the content service.
//! - [`TreeClient`] lists and reads a GitHub repository tree.
//!
//! Both are annotated for `mockall`; the generated `MockContentApi` and
//! `MockTreeClient` are exported under the default `test-export-mocks`
//! feature so integration tests in dependent crates can use them.

use async_trait::async_trait;

use mockall::automock;

use crate::config::SandboxKind;
use crate::error::GithubError;
use crate::payload::{OptionalFilesPayload, PlaylistPayload, SandboxPayload, ThumbnailPayload};

/// Error type for [`ContentApi`] calls.
pub type ApiError = Box<dyn std::error::Error + Send + Sync>;

/// Uploads to the content service. Every call is an idempotent PUT.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Replace the shared file sets samples can reference by name.
    async fn put_optional_files(&self, sets: &[OptionalFilesPayload]) -> Result<(), ApiError>;

    /// Create or replace a sample or template.
    async fn put_sandbox(&self, kind: SandboxKind, payload: &SandboxPayload)
        -> Result<(), ApiError>;

    async fn put_thumbnail(&self, id: &str, thumbnail: &ThumbnailPayload) -> Result<(), ApiError>;

    /// Replace a playlist owned by `user_id`.
    async fn put_playlist(&self, user_id: &str, playlist: &PlaylistPayload)
        -> Result<(), ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Submodules and symlinks; skipped by the fetcher.
    Other,
}

/// One node of a repository tree. `path` is always repository-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub sha: String,
    pub kind: EntryKind,
}

/// Read access to a repository tree.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TreeClient: Send + Sync {
    /// The directory entry to start a walk from.
    fn root(&self, path: &str) -> TreeEntry;

    /// Immediate children of `dir`.
    async fn list_dir(&self, dir: &TreeEntry) -> Result<Vec<TreeEntry>, GithubError>;

    /// Raw bytes of `file`.
    async fn read_blob(&self, file: &TreeEntry) -> Result<Vec<u8>, GithubError>;
}
