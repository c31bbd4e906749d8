use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, validating or assembling sandboxes.
///
/// All of these surface before any network call is made.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("{path}: id {id:?} is not a valid GUID")]
    InvalidGuid { path: PathBuf, id: String },

    #[error("{path}: attributes must contain an entry starting with {prefix:?}")]
    MissingAttribute { path: PathBuf, prefix: String },

    #[error("{path}: unknown common file set {name:?}")]
    UnknownCommonFiles { path: PathBuf, name: String },

    #[error("{path}: references common files but no common-files definition is configured")]
    NoCommonFilesConfig { path: PathBuf },

    #[error("playlist {playlist:?} references {path}, which has no config.json")]
    MissingSandbox { playlist: String, path: PathBuf },

    #[error("id {id} is shared by {first} and {second}")]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ManifestError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the GitHub clients and the tree fetcher.
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("failed to sign GitHub App token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
