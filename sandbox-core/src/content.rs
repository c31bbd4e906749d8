//! Text/binary classification shared by the uploader and the GitHub fetcher.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "ico", "webp"];
const OTHER_BINARY_EXTENSIONS: &[&str] = &[
    "woff", "woff2", "ttf", "otf", "eot", "zip", "gz", "pdf", "glb", "wasm",
];

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

pub fn is_image_path(path: &str) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_binary_path(path: &str) -> bool {
    is_image_path(path)
        || extension(path).is_some_and(|ext| OTHER_BINARY_EXTENSIONS.contains(&ext.as_str()))
}

/// MIME type for an image path, `application/octet-stream` when unknown.
pub fn image_mime_type(path: &str) -> &'static str {
    match extension(path).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// File contents after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    /// Binary extensions stay binary; everything else is text if it decodes as UTF-8.
    pub fn classify(path: &str, bytes: Vec<u8>) -> Self {
        if is_binary_path(path) {
            return FileContent::Binary(bytes);
        }
        match String::from_utf8(bytes) {
            Ok(text) => FileContent::Text(text),
            Err(e) => FileContent::Binary(e.into_bytes()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(s) => s.as_bytes(),
            FileContent::Binary(b) => b,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, FileContent::Binary(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
    Base64,
}

/// A file as sent to the content service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub content: String,
    pub encoding: Encoding,
}

impl From<FileContent> for FilePayload {
    fn from(content: FileContent) -> Self {
        match content {
            FileContent::Text(content) => FilePayload {
                content,
                encoding: Encoding::Utf8,
            },
            FileContent::Binary(bytes) => FilePayload {
                content: STANDARD.encode(bytes),
                encoding: Encoding::Base64,
            },
        }
    }
}

/// Decodes base64 as returned by the GitHub API, which wraps lines with `\n`.
pub fn decode_wrapped_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
