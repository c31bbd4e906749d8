//! Turns loaded manifests into the JSON bodies the content service accepts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::common_files::CommonFilesConfig;
use crate::content::{encode_base64, image_mime_type, FileContent, FilePayload};
use crate::error::ManifestError;
use crate::manifest::{IModelRef, LoadedManifest};
use crate::modules::{merge_modules, Module};
use crate::playlist::Playlist;

/// Metadata and sources for one sample or template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxPayload {
    pub id: String,
    pub name: String,
    pub description: String,
    pub entry: String,
    pub files: BTreeMap<String, FilePayload>,
    pub common_files: Vec<String>,
    pub attributes: Vec<String>,
    pub modules: Vec<Module>,
    #[serde(rename = "iModels")]
    pub i_models: Vec<IModelRef>,
}

/// One shared file set, uploaded once ahead of the samples that use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalFilesPayload {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub files: BTreeMap<String, FilePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailPayload {
    pub image: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistPayload {
    pub id: String,
    pub name: String,
    pub description: String,
    pub sandbox_ids: Vec<String>,
}

fn read_file(path: &Path, key: &str) -> Result<FilePayload, ManifestError> {
    let bytes = fs::read(path).map_err(|e| ManifestError::io(path, e))?;
    Ok(FileContent::classify(key, bytes).into())
}

/// Builds the upload body for one sandbox, reading every listed file from disk.
///
/// Common file sets are referenced by name only; their contents travel in
/// [`build_optional_files`].
pub fn build_sandbox_payload(
    loaded: &LoadedManifest,
    base_modules: &[Module],
    common: Option<&CommonFilesConfig>,
) -> Result<SandboxPayload, ManifestError> {
    let manifest = &loaded.manifest;

    let common_files = match (&manifest.common_files, common) {
        (Some(names), Some(common)) if !names.is_empty() => {
            common.resolve(names, &loaded.config_path)?;
            names.clone()
        }
        (Some(names), None) if !names.is_empty() => {
            return Err(ManifestError::NoCommonFilesConfig {
                path: loaded.config_path.clone(),
            });
        }
        _ => Vec::new(),
    };

    let mut files = BTreeMap::new();
    let listed = manifest
        .files
        .iter()
        .chain(std::iter::once(&manifest.entry));
    for relative in listed {
        if files.contains_key(relative) {
            continue;
        }
        let payload = read_file(&loaded.sandbox_dir.join(relative), relative)?;
        debug!(
            id = %manifest.id,
            file = %relative,
            encoding = ?payload.encoding,
            "Added file to payload"
        );
        files.insert(relative.clone(), payload);
    }

    let modules = merge_modules(base_modules, manifest.modules.as_deref());

    info!(
        id = %manifest.id,
        name = %manifest.name,
        files = files.len(),
        modules = modules.len(),
        "Built sandbox payload"
    );

    Ok(SandboxPayload {
        id: manifest.id.clone(),
        name: manifest.name.clone(),
        description: manifest.description.clone(),
        entry: manifest.entry.clone(),
        files,
        common_files,
        attributes: manifest.attributes.clone(),
        modules,
        i_models: manifest.i_models.clone().unwrap_or_default(),
    })
}

pub fn build_optional_files(
    common: &CommonFilesConfig,
) -> Result<Vec<OptionalFilesPayload>, ManifestError> {
    common
        .sets
        .iter()
        .map(|(name, set)| {
            let files = set
                .files
                .iter()
                .map(|relative| {
                    let payload = read_file(&common.file_path(relative), relative)?;
                    Ok((relative.clone(), payload))
                })
                .collect::<Result<BTreeMap<_, _>, ManifestError>>()?;
            Ok(OptionalFilesPayload {
                name: name.clone(),
                display_name: set.display_name.clone(),
                description: set.description.clone(),
                files,
            })
        })
        .collect()
}

pub fn build_thumbnail(
    loaded: &LoadedManifest,
) -> Result<Option<ThumbnailPayload>, ManifestError> {
    let Some(relative) = loaded.manifest.thumbnail.as_deref() else {
        return Ok(None);
    };
    let path = loaded.sandbox_dir.join(relative);
    let bytes = fs::read(&path).map_err(|e| ManifestError::io(&path, e))?;
    Ok(Some(ThumbnailPayload {
        image: encode_base64(&bytes),
        content_type: image_mime_type(relative).to_string(),
    }))
}

pub fn build_playlist(playlist: &Playlist, sandbox_ids: Vec<String>) -> PlaylistPayload {
    PlaylistPayload {
        id: playlist.id.clone(),
        name: playlist.name.clone(),
        description: playlist.description.clone(),
        sandbox_ids,
    }
}
