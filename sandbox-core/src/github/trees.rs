//! Tree access through the git database endpoints (`git/trees`, `git/blobs`).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::http::GithubHttp;
use crate::content::decode_wrapped_base64;
use crate::contract::{EntryKind, TreeClient, TreeEntry};
use crate::error::GithubError;

const SYMLINK_MODE: &str = "120000";

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    mode: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

pub(crate) async fn fetch_blob(http: &GithubHttp, sha: &str) -> Result<Vec<u8>, GithubError> {
    let blob: BlobResponse = http.get_repo_json(&["git", "blobs", sha], &[]).await?;
    match blob.encoding.as_str() {
        "base64" => decode_wrapped_base64(&blob.content).map_err(|e| GithubError::Decode {
            url: format!("git/blobs/{sha}"),
            message: e.to_string(),
        }),
        _ => Ok(blob.content.into_bytes()),
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

pub struct GitTreeClient {
    http: GithubHttp,
}

impl GitTreeClient {
    pub fn new(http: GithubHttp) -> Self {
        GitTreeClient { http }
    }

    async fn get_tree(&self, sha: &str) -> Result<TreeResponse, GithubError> {
        let tree: TreeResponse = self.http.get_repo_json(&["git", "trees", sha], &[]).await?;
        if tree.truncated {
            warn!(sha = %sha, "[FETCH] GitHub truncated the tree listing");
        }
        Ok(tree)
    }

    /// Walks from the reference's root tree down to `path`, one component at a time.
    async fn resolve_tree_sha(&self, path: &str) -> Result<String, GithubError> {
        let mut sha = self.http.repo().reference.clone();
        for component in path.split('/').filter(|s| !s.is_empty()) {
            let tree = self.get_tree(&sha).await?;
            sha = tree
                .tree
                .into_iter()
                .find(|item| item.path == component && item.kind == "tree")
                .map(|item| item.sha)
                .ok_or_else(|| GithubError::Decode {
                    url: format!("git/trees/{sha}"),
                    message: format!("no directory named {component:?} while resolving {path:?}"),
                })?;
        }
        Ok(sha)
    }
}

#[async_trait]
impl TreeClient for GitTreeClient {
    fn root(&self, path: &str) -> TreeEntry {
        TreeEntry {
            path: path.trim_matches('/').to_string(),
            sha: String::new(),
            kind: EntryKind::Dir,
        }
    }

    async fn list_dir(&self, dir: &TreeEntry) -> Result<Vec<TreeEntry>, GithubError> {
        let sha = if dir.sha.is_empty() {
            self.resolve_tree_sha(&dir.path).await?
        } else {
            dir.sha.clone()
        };
        let tree = self.get_tree(&sha).await?;
        let entries: Vec<TreeEntry> = tree
            .tree
            .into_iter()
            .map(|item| {
                let kind = match (item.kind.as_str(), item.mode.as_str()) {
                    ("blob", SYMLINK_MODE) => EntryKind::Other,
                    ("blob", _) => EntryKind::File,
                    ("tree", _) => EntryKind::Dir,
                    _ => EntryKind::Other,
                };
                TreeEntry {
                    path: join(&dir.path, &item.path),
                    sha: item.sha,
                    kind,
                }
            })
            .collect();
        debug!(path = %dir.path, entries = entries.len(), "[FETCH] Listed directory via git trees");
        Ok(entries)
    }

    async fn read_blob(&self, file: &TreeEntry) -> Result<Vec<u8>, GithubError> {
        fetch_blob(&self.http, &file.sha).await
    }
}
