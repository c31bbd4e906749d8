//! High-level pipeline: validate every sandbox on disk, then upload them one by one.
//!
//! Deployment is split in two phases so nothing touches the network until the
//! whole gallery is known to be consistent:
//!
//! - [`prepare`] reads the module list, common files, manifests and playlists,
//!   validates ids and attributes, and builds every payload. Any problem is an
//!   error and the run stops here.
//! - [`upload`] pushes the prepared payloads through a [`ContentApi`]
//!   sequentially, pausing between sandboxes. Failures are logged and recorded
//!   per item; the run continues and the returned [`DeployReport`] says whether
//!   everything went through.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::common_files::CommonFilesConfig;
use crate::config::{SandboxKind, SourceConfig, UploadOptions};
use crate::contract::ContentApi;
use crate::error::ManifestError;
use crate::manifest::{
    discover_manifests, load_manifest, validate_attributes, validate_id, LoadedManifest,
};
use crate::modules::load_modules;
use crate::payload::{
    build_optional_files, build_playlist, build_sandbox_payload, build_thumbnail,
    OptionalFilesPayload, PlaylistPayload, SandboxPayload, ThumbnailPayload,
};
use crate::playlist::{load_playlists, normalize, validate_playlists};

/// Everything needed to upload one gallery, fully validated.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub kind: SandboxKind,
    pub optional_files: Vec<OptionalFilesPayload>,
    pub sandboxes: Vec<PlannedSandbox>,
    pub playlists: Vec<PlaylistPayload>,
}

#[derive(Debug, Clone)]
pub struct PlannedSandbox {
    pub config_path: PathBuf,
    pub payload: SandboxPayload,
    pub thumbnail: Option<ThumbnailPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub target: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub kind: SandboxKind,
    pub uploaded: Vec<String>,
    pub thumbnails: usize,
    pub playlists: usize,
    pub failures: Vec<UploadFailure>,
}

impl DeployReport {
    fn new(kind: SandboxKind) -> Self {
        DeployReport {
            kind,
            uploaded: Vec::new(),
            thumbnails: 0,
            playlists: 0,
            failures: Vec::new(),
        }
    }

    fn record_failure(&mut self, target: impl Into<String>, error: impl ToString) {
        self.failures.push(UploadFailure {
            target: target.into(),
            error: error.to_string(),
        });
    }

    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads, validates and assembles every sandbox under `config.root`.
///
/// Touches only the filesystem.
pub fn prepare(config: &SourceConfig, kind: SandboxKind) -> Result<DeployPlan, ManifestError> {
    info!(kind = kind.label(), "[DEPLOY] Preparing deployment");
    config.trace_loaded(kind);

    let base_modules = load_modules(&config.modules)?;
    let common = config
        .common_files
        .as_deref()
        .map(CommonFilesConfig::load)
        .transpose()?;

    let manifests = discover_manifests(&config.root, &config.manifest_glob)?
        .iter()
        .map(|path| load_manifest(path))
        .collect::<Result<Vec<LoadedManifest>, _>>()?;

    let mut ids: HashMap<String, PathBuf> = HashMap::new();
    for loaded in &manifests {
        validate_id(loaded)?;
        validate_attributes(loaded, kind.required_prefixes())?;
        let dir = normalize(&loaded.sandbox_dir);
        if let Some(first) = ids.insert(loaded.manifest.id.to_ascii_lowercase(), dir.clone()) {
            return Err(ManifestError::DuplicateId {
                id: loaded.manifest.id.clone(),
                first,
                second: dir,
            });
        }
    }
    info!(count = manifests.len(), "[DEPLOY] Manifests validated");

    let playlists = load_playlists(&config.playlist)?;
    let member_ids = validate_playlists(&playlists, &manifests)?;

    let sandboxes = manifests
        .iter()
        .map(|loaded| {
            Ok(PlannedSandbox {
                config_path: loaded.config_path.clone(),
                payload: build_sandbox_payload(loaded, &base_modules, common.as_ref())?,
                thumbnail: build_thumbnail(loaded)?,
            })
        })
        .collect::<Result<Vec<_>, ManifestError>>()?;

    let optional_files = match (kind, &common) {
        (SandboxKind::Sample, Some(common)) => build_optional_files(common)?,
        _ => Vec::new(),
    };

    let playlists = playlists
        .iter()
        .zip(member_ids)
        .map(|(loaded, ids)| build_playlist(&loaded.playlist, ids))
        .collect();

    let plan = DeployPlan {
        kind,
        optional_files,
        sandboxes,
        playlists,
    };
    info!(
        kind = kind.label(),
        sandboxes = plan.sandboxes.len(),
        optional_sets = plan.optional_files.len(),
        playlists = plan.playlists.len(),
        "[DEPLOY] Plan ready"
    );
    Ok(plan)
}

/// Checks that no id is shared by two sandboxes across several prepared plans.
///
/// Samples and templates share the thumbnail endpoint, so their ids must not
/// collide either. Ids compare case-insensitively.
pub fn validate_unique_ids(plans: &[&DeployPlan]) -> Result<(), ManifestError> {
    let mut ids: HashMap<String, PathBuf> = HashMap::new();
    for sandbox in plans.iter().flat_map(|plan| &plan.sandboxes) {
        let dir = normalize(sandbox.config_path.parent().unwrap_or(&sandbox.config_path));
        let key = sandbox.payload.id.to_ascii_lowercase();
        match ids.get(&key) {
            Some(first) if *first != dir => {
                error!(
                    id = %sandbox.payload.id,
                    first = %first.display(),
                    second = %dir.display(),
                    "[DEPLOY][ERROR] Duplicate sandbox id"
                );
                return Err(ManifestError::DuplicateId {
                    id: sandbox.payload.id.clone(),
                    first: first.clone(),
                    second: dir,
                });
            }
            Some(_) => {}
            None => {
                ids.insert(key, dir);
            }
        }
    }
    Ok(())
}

/// Uploads a prepared plan. Never fails as a whole; check [`DeployReport::success`].
pub async fn upload<A>(plan: &DeployPlan, api: &A, options: &UploadOptions) -> DeployReport
where
    A: ContentApi + ?Sized,
{
    let kind = plan.kind;
    let mut report = DeployReport::new(kind);
    info!(kind = kind.label(), "[DEPLOY] Starting upload");

    if !plan.optional_files.is_empty() {
        match api.put_optional_files(&plan.optional_files).await {
            Ok(()) => info!(sets = plan.optional_files.len(), "[UPLOAD] Optional files uploaded"),
            Err(e) => {
                error!(error = %e, "[UPLOAD][ERROR] Optional files upload failed");
                report.record_failure("optionalFiles", e);
            }
        }
    }

    for sandbox in &plan.sandboxes {
        let id = &sandbox.payload.id;
        match api.put_sandbox(kind, &sandbox.payload).await {
            Ok(()) => {
                info!(id = %id, name = %sandbox.payload.name, "[UPLOAD] Metadata uploaded");
                report.uploaded.push(id.clone());
                if let Some(thumbnail) = &sandbox.thumbnail {
                    match api.put_thumbnail(id, thumbnail).await {
                        Ok(()) => {
                            info!(id = %id, "[UPLOAD] Thumbnail uploaded");
                            report.thumbnails += 1;
                        }
                        Err(e) => {
                            error!(id = %id, error = %e, "[UPLOAD][ERROR] Thumbnail upload failed");
                            report.record_failure(format!("{id} thumbnail"), e);
                        }
                    }
                }
            }
            Err(e) => {
                error!(
                    id = %id,
                    config = %sandbox.config_path.display(),
                    error = %e,
                    "[UPLOAD][ERROR] Metadata upload failed"
                );
                report.record_failure(id.clone(), e);
            }
        }
        tokio::time::sleep(options.delay).await;
    }

    match options.playlist_user.as_deref() {
        Some(user) => {
            for playlist in &plan.playlists {
                match api.put_playlist(user, playlist).await {
                    Ok(()) => {
                        info!(
                            playlist = %playlist.name,
                            user = %user,
                            "[UPLOAD] Playlist uploaded"
                        );
                        report.playlists += 1;
                    }
                    Err(e) => {
                        error!(
                            playlist = %playlist.name,
                            error = %e,
                            "[UPLOAD][ERROR] Playlist upload failed"
                        );
                        report.record_failure(format!("playlist {}", playlist.id), e);
                    }
                }
            }
        }
        None if !plan.playlists.is_empty() => {
            warn!(
                playlists = plan.playlists.len(),
                "[UPLOAD] No playlist owner configured, skipping playlists"
            );
        }
        None => {}
    }

    info!(
        kind = kind.label(),
        uploaded = report.uploaded.len(),
        failures = report.failures.len(),
        "[DEPLOY] Upload finished"
    );
    report
}
