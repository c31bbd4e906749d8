use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_MANIFEST_GLOB: &str = "**/config.json";
pub const DEFAULT_UPLOAD_DELAY: Duration = Duration::from_millis(25);

pub const SAMPLE_ATTRIBUTE_PREFIXES: &[&str] = &["itwin-version:", "api-path:", "api-group-id:"];
pub const TEMPLATE_ATTRIBUTE_PREFIXES: &[&str] = &["itwin-version:"];

/// Which gallery a set of sandboxes is deployed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    Sample,
    Template,
}

impl SandboxKind {
    /// Attribute prefixes every manifest of this kind must declare.
    pub fn required_prefixes(self) -> &'static [&'static str] {
        match self {
            SandboxKind::Sample => SAMPLE_ATTRIBUTE_PREFIXES,
            SandboxKind::Template => TEMPLATE_ATTRIBUTE_PREFIXES,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SandboxKind::Sample => "sample",
            SandboxKind::Template => "template",
        }
    }
}

/// Where the manifests, module list, common files and playlist of one gallery live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub root: PathBuf,
    pub playlist: PathBuf,
    pub modules: PathBuf,
    #[serde(default)]
    pub common_files: Option<PathBuf>,
    #[serde(default = "default_manifest_glob")]
    pub manifest_glob: String,
}

fn default_manifest_glob() -> String {
    DEFAULT_MANIFEST_GLOB.to_string()
}

impl SourceConfig {
    pub fn samples_default() -> Self {
        SourceConfig {
            root: PathBuf::from("./Samples"),
            playlist: PathBuf::from("./sample-playlist.json"),
            modules: PathBuf::from("./modules-v3.json"),
            common_files: Some(PathBuf::from("./common-files-config.json")),
            manifest_glob: default_manifest_glob(),
        }
    }

    pub fn templates_default() -> Self {
        SourceConfig {
            root: PathBuf::from("./Templates"),
            playlist: PathBuf::from("./template-playlist.json"),
            modules: PathBuf::from("./modules-v3.json"),
            common_files: None,
            manifest_glob: default_manifest_glob(),
        }
    }

    pub fn trace_loaded(&self, kind: SandboxKind) {
        info!(
            kind = kind.label(),
            root = %self.root.display(),
            playlist = %self.playlist.display(),
            modules = %self.modules.display(),
            glob = %self.manifest_glob,
            "Loaded source config"
        );
        debug!(?self, "Source config loaded (full debug)");
    }
}

/// Knobs for the upload phase.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Pause after each sandbox upload.
    pub delay: Duration,
    /// Owner whose playlists are replaced. Playlists are skipped when unset.
    pub playlist_user: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        UploadOptions {
            delay: DEFAULT_UPLOAD_DELAY,
            playlist_user: None,
        }
    }
}
