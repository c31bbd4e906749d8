//! GitHub App authentication: sign a short-lived JWT with the app's private key
//! and exchange it for an installation access token.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::http::{api_url, build_client, send_json, with_github_headers};
use crate::error::GithubError;

/// Backdating `iat` tolerates clock drift between us and GitHub.
const CLOCK_SKEW_SECS: i64 = 60;
/// GitHub rejects app tokens that live longer than ten minutes.
const JWT_LIFETIME_SECS: i64 = 540;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub private_key_pem: String,
    pub installation_id: u64,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key_pem", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Signs an RS256 app JWT valid from `now - 60s` to `now + 540s`.
pub fn app_jwt(credentials: &AppCredentials, now: i64) -> Result<String, GithubError> {
    let claims = AppClaims {
        iat: now - CLOCK_SKEW_SECS,
        exp: now + JWT_LIFETIME_SECS,
        iss: credentials.app_id.clone(),
    };
    let key = EncodingKey::from_rsa_pem(credentials.private_key_pem.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
}

/// Exchanges an app JWT for an installation access token.
pub async fn installation_token(
    api_base: &str,
    credentials: &AppCredentials,
) -> Result<InstallationToken, GithubError> {
    let jwt = app_jwt(credentials, Utc::now().timestamp())?;
    let installation_id = credentials.installation_id.to_string();
    let url = api_url(
        api_base,
        &["app", "installations", installation_id.as_str(), "access_tokens"],
    )?;
    let url_str = url.to_string();
    let client = build_client(api_base)?;

    info!(
        app_id = %credentials.app_id,
        installation_id = credentials.installation_id,
        "Requesting GitHub installation token"
    );
    let request = with_github_headers(client.post(url), &jwt);
    match send_json::<InstallationToken>(request, &url_str).await {
        Ok(token) => {
            info!(expires_at = ?token.expires_at, "Obtained GitHub installation token");
            Ok(token)
        }
        Err(e) => {
            error!(error = %e, "Failed to obtain GitHub installation token");
            Err(e)
        }
    }
}
