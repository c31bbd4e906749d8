//! Recursive download of a repository subtree through any [`TreeClient`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use tracing::{debug, error, info};

use crate::content::FileContent;
use crate::contract::{EntryKind, TreeClient, TreeEntry};
use crate::error::GithubError;

/// A downloaded file. Images are kept as bytes, everything else decoded as text when possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub path: String,
    pub content: FileContent,
}

impl RepoFile {
    pub fn from_bytes(path: String, bytes: Vec<u8>) -> Self {
        let content = FileContent::classify(&path, bytes);
        RepoFile { path, content }
    }
}

/// Lists `dir`, then downloads files and descends into subdirectories concurrently.
///
/// The first failing request aborts the walk.
pub fn fetch_dir<'a, C>(
    client: &'a C,
    dir: TreeEntry,
) -> BoxFuture<'a, Result<Vec<RepoFile>, GithubError>>
where
    C: TreeClient + ?Sized,
{
    async move {
        let entries = client.list_dir(&dir).await?;
        let tasks = entries.into_iter().map(|entry| async move {
            match entry.kind {
                EntryKind::Dir => fetch_dir(client, entry).await,
                EntryKind::File => {
                    let bytes = client.read_blob(&entry).await?;
                    debug!(path = %entry.path, size = bytes.len(), "[FETCH] Downloaded file");
                    Ok(vec![RepoFile::from_bytes(entry.path, bytes)])
                }
                EntryKind::Other => {
                    debug!(path = %entry.path, "[FETCH] Skipping non-file entry");
                    Ok(Vec::new())
                }
            }
        });
        let nested = try_join_all(tasks).await?;
        Ok(nested.into_iter().flatten().collect())
    }
    .boxed()
}

/// Fetches each top-level path in turn, logging how long each one took.
pub async fn fetch_paths<C>(client: &C, paths: &[String]) -> Result<Vec<RepoFile>, GithubError>
where
    C: TreeClient + ?Sized,
{
    let mut files = Vec::new();
    for path in paths {
        let started = Instant::now();
        match fetch_dir(client, client.root(path)).await {
            Ok(fetched) => {
                info!(
                    path = %path,
                    files = fetched.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "[FETCH] Fetched path"
                );
                files.extend(fetched);
            }
            Err(e) => {
                error!(path = %path, error = %e, "[FETCH][ERROR] Fetch failed");
                return Err(e);
            }
        }
    }
    Ok(files)
}

/// Writes fetched files below `out_dir`, creating directories as needed.
pub fn write_files(out_dir: &Path, files: &[RepoFile]) -> Result<Vec<PathBuf>, GithubError> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let relative = Path::new(&file.path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            error!(
                path = %file.path,
                "[FETCH][ERROR] Refusing to write outside the output directory"
            );
            return Err(GithubError::Io {
                path: relative.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path escapes the output directory",
                ),
            });
        }
        let target = out_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| GithubError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, file.content.as_bytes()).map_err(|source| GithubError::Io {
            path: target.clone(),
            source,
        })?;
        written.push(target);
    }
    info!(out_dir = %out_dir.display(), files = written.len(), "[FETCH] Wrote files");
    Ok(written)
}
