//! Fetching repository trees from GitHub.
//!
//! Two interchangeable [`TreeClient`] implementations are provided:
//! [`ContentsClient`] walks the REST `contents` endpoint, [`GitTreeClient`]
//! walks the git database (`git/trees` + `git/blobs`). Either one drives
//! [`fetch_dir`]/[`fetch_paths`]. Credentials come from a GitHub App
//! installation token ([`app_auth`]) or any token with read access.

pub mod app_auth;
pub mod contents;
pub mod fetch;
pub mod http;
pub mod trees;

pub use crate::contract::{EntryKind, TreeClient, TreeEntry};
pub use contents::ContentsClient;
pub use fetch::{fetch_dir, fetch_paths, write_files, RepoFile};
pub use http::{GithubHttp, RepoRef, DEFAULT_API_BASE};
pub use trees::GitTreeClient;
