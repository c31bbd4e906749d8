//! `load_config`: reads the optional YAML deploy config and layers environment
//! settings on top.
//!
//! Every field is optional; omitted fields fall back to the fixed relative paths
//! the gallery repository uses (`./Samples`, `./sample-playlist.json`, ...).
//! Secrets never live in the YAML file. The client secret is a CLI argument and
//! GitHub credentials come from the environment.
//!
//! ```yaml
//! samples:
//!   root: ./Samples
//!   playlist: ./sample-playlist.json
//!   modules: ./modules-v3.json
//!   common_files: ./common-files-config.json
//! templates:
//!   root: ./Templates
//! upload:
//!   delay_ms: 25
//!   client_id: sandbox-deploy
//!   scope: codeshare
//!   playlist_user: gallery-owner
//! ```

use anyhow::{anyhow, Context, Result};
use sandbox_core::config::{SourceConfig, UploadOptions, DEFAULT_UPLOAD_DELAY};
use sandbox_core::github::app_auth::AppCredentials;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_CLIENT_ID: &str = "sandbox-deploy";

pub const ENV_CLIENT_ID: &str = "DEPLOY_CLIENT_ID";
pub const ENV_SCOPE: &str = "DEPLOY_SCOPE";
pub const ENV_PLAYLIST_USER: &str = "DEPLOY_PLAYLIST_USER";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_APP_ID: &str = "GITHUB_APP_ID";
pub const ENV_GITHUB_APP_PRIVATE_KEY: &str = "GITHUB_APP_PRIVATE_KEY";
pub const ENV_GITHUB_APP_PRIVATE_KEY_PATH: &str = "GITHUB_APP_PRIVATE_KEY_PATH";
pub const ENV_GITHUB_APP_INSTALLATION_ID: &str = "GITHUB_APP_INSTALLATION_ID";

/// Resolved deploy settings.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub samples: SourceConfig,
    pub templates: SourceConfig,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub delay: Duration,
    pub client_id: String,
    pub scope: Option<String>,
    pub playlist_user: Option<String>,
}

impl UploadSettings {
    pub fn options(&self) -> UploadOptions {
        UploadOptions {
            delay: self.delay,
            playlist_user: self.playlist_user.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    samples: SourceSection,
    #[serde(default)]
    templates: SourceSection,
    #[serde(default)]
    upload: UploadSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceSection {
    root: Option<PathBuf>,
    playlist: Option<PathBuf>,
    modules: Option<PathBuf>,
    common_files: Option<PathBuf>,
    manifest_glob: Option<String>,
}

impl SourceSection {
    fn apply(self, mut defaults: SourceConfig) -> SourceConfig {
        if let Some(root) = self.root {
            defaults.root = root;
        }
        if let Some(playlist) = self.playlist {
            defaults.playlist = playlist;
        }
        if let Some(modules) = self.modules {
            defaults.modules = modules;
        }
        if self.common_files.is_some() {
            defaults.common_files = self.common_files;
        }
        if let Some(glob) = self.manifest_glob {
            defaults.manifest_glob = glob;
        }
        defaults
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UploadSection {
    delay_ms: Option<u64>,
    client_id: Option<String>,
    scope: Option<String>,
    playlist_user: Option<String>,
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Loads the YAML config at `path`, or the defaults when no path is given, then
/// applies `DEPLOY_CLIENT_ID`, `DEPLOY_SCOPE` and `DEPLOY_PLAYLIST_USER`.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let raw = match path {
        Some(path) => read_raw(path)?,
        None => {
            info!("No config file given, using default paths");
            RawConfig::default()
        }
    };

    let upload = raw.upload;
    let config = CliConfig {
        samples: raw.samples.apply(SourceConfig::samples_default()),
        templates: raw.templates.apply(SourceConfig::templates_default()),
        upload: UploadSettings {
            delay: upload
                .delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_UPLOAD_DELAY),
            client_id: env_nonempty(ENV_CLIENT_ID)
                .or(upload.client_id)
                .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            scope: env_nonempty(ENV_SCOPE).or(upload.scope),
            playlist_user: env_nonempty(ENV_PLAYLIST_USER).or(upload.playlist_user),
        },
    };
    info!(
        client_id = %config.upload.client_id,
        delay_ms = config.upload.delay.as_millis() as u64,
        playlist_user = ?config.upload.playlist_user,
        "Resolved deploy configuration"
    );
    Ok(config)
}

fn read_raw(path: &Path) -> Result<RawConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;
    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow!("Failed to parse config YAML: {e}")
    })
}

/// How the `fetch` command authenticates against GitHub.
#[derive(Debug, Clone)]
pub enum GithubAuth {
    Token(String),
    App(AppCredentials),
}

/// `GITHUB_TOKEN` wins; otherwise all three `GITHUB_APP_*` settings are required.
pub fn github_auth_from_env() -> Result<GithubAuth> {
    if let Some(token) = env_nonempty(ENV_GITHUB_TOKEN) {
        info!("Using GitHub token from environment");
        return Ok(GithubAuth::Token(token));
    }

    let app_id = env_nonempty(ENV_GITHUB_APP_ID).ok_or_else(|| {
        anyhow!(
            "Set {ENV_GITHUB_TOKEN}, or {ENV_GITHUB_APP_ID} with an installation and private key"
        )
    })?;
    let installation_id = env_nonempty(ENV_GITHUB_APP_INSTALLATION_ID)
        .ok_or_else(|| {
            anyhow!("{ENV_GITHUB_APP_INSTALLATION_ID} is required with {ENV_GITHUB_APP_ID}")
        })?
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{ENV_GITHUB_APP_INSTALLATION_ID} must be a number"))?;
    let private_key_pem = match (
        env_nonempty(ENV_GITHUB_APP_PRIVATE_KEY),
        env_nonempty(ENV_GITHUB_APP_PRIVATE_KEY_PATH),
    ) {
        // Keys pasted into .env files usually carry literal "\n" sequences.
        (Some(inline), _) => inline.replace("\\n", "\n"),
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read GitHub App private key from {path}"))?,
        (None, None) => {
            return Err(anyhow!(
                "{ENV_GITHUB_APP_PRIVATE_KEY} or {ENV_GITHUB_APP_PRIVATE_KEY_PATH} \
                 is required with {ENV_GITHUB_APP_ID}"
            ))
        }
    };

    info!(app_id = %app_id, installation_id, "Using GitHub App credentials from environment");
    Ok(GithubAuth::App(AppCredentials {
        app_id,
        private_key_pem,
        installation_id,
    }))
}
