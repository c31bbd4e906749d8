//! Tree access through the REST `contents` endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::http::GithubHttp;
use super::trees::fetch_blob;
use crate::content::decode_wrapped_base64;
use crate::contract::{EntryKind, TreeClient, TreeEntry};
use crate::error::GithubError;

#[derive(Debug, Deserialize)]
struct ContentItem {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

/// A directory lists its children; a file path returns the file itself.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Dir(Vec<ContentItem>),
    File(ContentItem),
}

impl ContentItem {
    fn to_entry(&self) -> TreeEntry {
        let kind = match self.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Dir,
            _ => EntryKind::Other,
        };
        TreeEntry {
            path: self.path.clone(),
            sha: self.sha.clone(),
            kind,
        }
    }
}

pub struct ContentsClient {
    http: GithubHttp,
}

impl ContentsClient {
    pub fn new(http: GithubHttp) -> Self {
        ContentsClient { http }
    }

    async fn get_contents(&self, path: &str) -> Result<ContentsResponse, GithubError> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let reference = self.http.repo().reference.clone();
        self.http
            .get_repo_json(&segments, &[("ref", reference.as_str())])
            .await
    }
}

#[async_trait]
impl TreeClient for ContentsClient {
    fn root(&self, path: &str) -> TreeEntry {
        TreeEntry {
            path: path.trim_matches('/').to_string(),
            sha: String::new(),
            kind: EntryKind::Dir,
        }
    }

    async fn list_dir(&self, dir: &TreeEntry) -> Result<Vec<TreeEntry>, GithubError> {
        let entries = match self.get_contents(&dir.path).await? {
            ContentsResponse::Dir(items) => items.iter().map(ContentItem::to_entry).collect(),
            ContentsResponse::File(item) => vec![item.to_entry()],
        };
        debug!(path = %dir.path, entries = entries.len(), "[FETCH] Listed directory via contents");
        Ok(entries)
    }

    async fn read_blob(&self, file: &TreeEntry) -> Result<Vec<u8>, GithubError> {
        let item = match self.get_contents(&file.path).await? {
            ContentsResponse::File(item) => item,
            ContentsResponse::Dir(_) => {
                return Err(GithubError::Decode {
                    url: file.path.clone(),
                    message: "expected a file, got a directory listing".to_string(),
                })
            }
        };
        match (item.encoding.as_deref(), item.content.as_deref()) {
            (Some("base64"), Some(content)) => {
                decode_wrapped_base64(content).map_err(|e| GithubError::Decode {
                    url: file.path.clone(),
                    message: e.to_string(),
                })
            }
            // Files over 1 MB come back without inline content.
            _ => fetch_blob(&self.http, &item.sha).await,
        }
    }
}
