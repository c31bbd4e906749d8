use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::GithubError;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const AGENT: &str = concat!("sandbox-deploy/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(api_base: &str) -> Result<Client, GithubError> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| GithubError::Http {
            url: api_base.to_string(),
            source,
        })
}

/// Appends `segments` to `base`, percent-encoding each one.
pub(crate) fn api_url(base: &str, segments: &[&str]) -> Result<Url, GithubError> {
    let mut url = Url::parse(base).map_err(|e| GithubError::Decode {
        url: base.to_string(),
        message: format!("invalid API base URL: {e}"),
    })?;
    url.path_segments_mut()
        .map_err(|_| GithubError::Decode {
            url: base.to_string(),
            message: "API base URL cannot have path segments".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn with_github_headers(request: RequestBuilder, bearer: &str) -> RequestBuilder {
    request
        .header(AUTHORIZATION, format!("Bearer {bearer}"))
        .header(ACCEPT, GITHUB_ACCEPT)
        .header(USER_AGENT, AGENT)
        .header(API_VERSION_HEADER, API_VERSION)
}

/// Sends `request` and decodes a JSON body, turning non-2xx responses into [`GithubError::Status`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, GithubError> {
    let response = request.send().await.map_err(|source| GithubError::Http {
        url: url.to_string(),
        source,
    })?;
    let status = response.status();
    if !status.is_success() {
        let headers = format!("{:?}", response.headers());
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        error!(
            status = %status,
            url = %url,
            headers = %headers,
            body = %body,
            "GitHub API returned error"
        );
        return Err(GithubError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    debug!(status = %status, url = %url, "GitHub API request succeeded");
    response.json::<T>().await.map_err(|e| GithubError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Repository coordinates shared by both tree clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    /// Branch, tag or commit.
    pub reference: String,
}

/// An authenticated GitHub REST client bound to one repository.
#[derive(Clone)]
pub struct GithubHttp {
    client: Client,
    api_base: String,
    token: String,
    repo: RepoRef,
}

impl std::fmt::Debug for GithubHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubHttp")
            .field("api_base", &self.api_base)
            .field("repo", &self.repo)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl GithubHttp {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        repo: RepoRef,
    ) -> Result<Self, GithubError> {
        let api_base = api_base.into();
        let client = build_client(&api_base)?;
        Ok(GithubHttp {
            client,
            api_base,
            token: token.into(),
            repo,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// GET `/repos/{owner}/{repo}/{segments...}` and decode the JSON body.
    pub(crate) async fn get_repo_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, GithubError> {
        let mut all = vec!["repos", self.repo.owner.as_str(), self.repo.repo.as_str()];
        all.extend_from_slice(segments);
        let mut url = api_url(&self.api_base, &all)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let url_str = url.to_string();
        let request = with_github_headers(self.client.get(url), &self.token);
        send_json(request, &url_str).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_encodes_segments() {
        let segments = ["repos", "o", "r", "contents", "a b"];
        let url = api_url("https://api.github.com", &segments).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/o/r/contents/a%20b");
    }

    #[test]
    fn api_url_keeps_base_path() {
        let url = api_url("http://localhost:1234/api/v3/", &["app"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:1234/api/v3/app");
    }

    #[test]
    fn debug_redacts_token() {
        let http = GithubHttp::new(
            DEFAULT_API_BASE,
            "secret-token",
            RepoRef {
                owner: "o".into(),
                repo: "r".into(),
                reference: "main".into(),
            },
        )
        .unwrap();
        let printed = format!("{http:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("REDACTED"));
    }
}
