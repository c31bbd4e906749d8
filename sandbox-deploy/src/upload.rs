//! # Content service client
//!
//! [`BackendClient`] implements the core [`ContentApi`] seam against the
//! content service's REST surface. Every call is a JSON `PUT` carrying the
//! bearer token obtained by [`crate::auth`].
//!
//! | call                 | endpoint                           |
//! |----------------------|------------------------------------|
//! | `put_optional_files` | `PUT /api/optionalFiles`           |
//! | `put_sandbox`        | `PUT /api/sample`                  |
//! |                      | `PUT /api/template/{id}`           |
//! | `put_thumbnail`      | `PUT /api/codeshare/{id}/thumbnail`|
//! | `put_playlist`       | `PUT /api/user/{user}/playlist`    |

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use sandbox_core::config::SandboxKind;
use sandbox_core::contract::{ApiError, ContentApi};
use sandbox_core::payload::{
    OptionalFilesPayload, PlaylistPayload, SandboxPayload, ThumbnailPayload,
};
use serde::Serialize;
use std::time::Duration;

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub fn http_client() -> Result<Client, ApiError> {
    Ok(Client::builder().timeout(HTTP_TIMEOUT).build()?)
}

pub struct BackendClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl BackendClient {
    pub fn new(client: Client, base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| format!("Invalid backend base URL {base_url:?}: {e}"))?;
        if base_url.cannot_be_a_base() {
            return Err(format!("Backend base URL {base_url} cannot carry a path").into());
        }
        tracing::info!(base_url = %base_url, "Initialized content service client");
        Ok(BackendClient {
            client,
            base_url,
            token: token.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    async fn put_json<T: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &T,
    ) -> Result<(), ApiError> {
        let url = self.url(segments);
        let response = self
            .client
            .put(url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Request to content service failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let headers = format!("{:?}", response.headers());
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
            tracing::error!(
                status = %status,
                url = %url,
                headers = %headers,
                body = %body,
                "Content service returned error"
            );
            return Err(format!("PUT {url} returned {status}: {body}").into());
        }
        tracing::debug!(status = %status, url = %url, "PUT succeeded");
        Ok(())
    }
}

#[async_trait]
impl ContentApi for BackendClient {
    async fn put_optional_files(&self, sets: &[OptionalFilesPayload]) -> Result<(), ApiError> {
        tracing::info!(sets = sets.len(), "Uploading optional files");
        self.put_json(&["optionalFiles"], sets).await
    }

    async fn put_sandbox(
        &self,
        kind: SandboxKind,
        payload: &SandboxPayload,
    ) -> Result<(), ApiError> {
        tracing::info!(
            kind = kind.label(),
            id = %payload.id,
            name = %payload.name,
            "Uploading sandbox"
        );
        match kind {
            SandboxKind::Sample => self.put_json(&["sample"], payload).await,
            SandboxKind::Template => {
                self.put_json(&["template", payload.id.as_str()], payload)
                    .await
            }
        }
    }

    async fn put_thumbnail(&self, id: &str, thumbnail: &ThumbnailPayload) -> Result<(), ApiError> {
        tracing::info!(id = %id, content_type = %thumbnail.content_type, "Uploading thumbnail");
        self.put_json(&["codeshare", id, "thumbnail"], thumbnail).await
    }

    async fn put_playlist(
        &self,
        user_id: &str,
        playlist: &PlaylistPayload,
    ) -> Result<(), ApiError> {
        tracing::info!(user_id = %user_id, playlist = %playlist.id, "Uploading playlist");
        self.put_json(&["user", user_id, "playlist"], playlist).await
    }
}
