//! OAuth2 client-credentials exchange against the identity authority.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

/// Everything needed to request a deploy token.
#[derive(Clone)]
pub struct ClientCredentials {
    pub authority: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("authority", &self.authority)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub fn token_url(authority: &str) -> String {
    format!("{}/connect/token", authority.trim_end_matches('/'))
}

/// POSTs the client-credentials grant and returns the bearer token.
pub async fn fetch_access_token(
    client: &Client,
    credentials: &ClientCredentials,
) -> Result<String> {
    let url = token_url(&credentials.authority);
    let mut form = vec![
        ("grant_type", "client_credentials"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
    ];
    if let Some(scope) = credentials.scope.as_deref() {
        form.push(("scope", scope));
    }

    info!(url = %url, client_id = %credentials.client_id, "Requesting access token");
    let response = client
        .post(&url)
        .form(&form)
        .send()
        .await
        .with_context(|| format!("Token request to {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        error!(status = %status, url = %url, body = %body, "Token endpoint returned error");
        return Err(anyhow!("Token endpoint {url} returned {status}: {body}"));
    }

    let token: TokenResponse = response
        .json()
        .await
        .with_context(|| format!("Token endpoint {url} returned an unexpected body"))?;
    info!(expires_in = ?token.expires_in, "Obtained access token");
    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_url_ignores_trailing_slash() {
        assert_eq!(
            token_url("https://ims.example.com/"),
            "https://ims.example.com/connect/token"
        );
        assert_eq!(
            token_url("https://ims.example.com"),
            "https://ims.example.com/connect/token"
        );
    }

    #[test]
    fn debug_hides_secret() {
        let creds = ClientCredentials {
            authority: "https://ims.example.com".into(),
            client_id: "deployer".into(),
            client_secret: "hunter2".into(),
            scope: None,
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
