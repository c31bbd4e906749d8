//! Playlists group sandboxes for display in the gallery.
//!
//! A playlist file holds an array of playlists, each listing sandbox
//! directories relative to the playlist file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ManifestError;
use crate::manifest::{is_valid_guid, LoadedManifest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "templates")]
    pub samples: Vec<String>,
}

/// A playlist with its member paths resolved against the playlist file.
#[derive(Debug, Clone)]
pub struct LoadedPlaylist {
    pub playlist: Playlist,
    pub members: Vec<PathBuf>,
}

pub fn load_playlists(path: &Path) -> Result<Vec<LoadedPlaylist>, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
    let playlists: Vec<Playlist> =
        serde_json::from_str(&raw).map_err(|e| ManifestError::json(path, e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    info!(path = %path.display(), count = playlists.len(), "Loaded playlists");

    Ok(playlists
        .into_iter()
        .map(|playlist| {
            let members = playlist
                .samples
                .iter()
                .map(|member| normalize(&base_dir.join(member)))
                .collect();
            LoadedPlaylist { playlist, members }
        })
        .collect())
}

/// Lexically removes `.` and `..` so equivalent paths compare equal.
pub fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves every playlist member to its manifest and enforces id invariants.
///
/// Returns, per playlist, the ordered ids of its members.
pub fn validate_playlists(
    playlists: &[LoadedPlaylist],
    manifests: &[LoadedManifest],
) -> Result<Vec<Vec<String>>, ManifestError> {
    let by_dir: HashMap<PathBuf, &LoadedManifest> = manifests
        .iter()
        .map(|m| (normalize(&m.sandbox_dir), m))
        .collect();

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut ids_per_playlist = Vec::with_capacity(playlists.len());

    for loaded in playlists {
        let mut ids = Vec::with_capacity(loaded.members.len());
        for member in &loaded.members {
            let manifest = by_dir
                .get(member)
                .ok_or_else(|| ManifestError::MissingSandbox {
                    playlist: loaded.playlist.name.clone(),
                    path: member.clone(),
                })?;
            let id = &manifest.manifest.id;
            if !is_valid_guid(id) {
                return Err(ManifestError::InvalidGuid {
                    path: manifest.config_path.clone(),
                    id: id.clone(),
                });
            }
            // Ids are compared case-insensitively, as GUIDs are.
            let key = id.to_ascii_lowercase();
            match seen.get(&key) {
                Some(first) if first != member => {
                    return Err(ManifestError::DuplicateId {
                        id: id.clone(),
                        first: first.clone(),
                        second: member.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(key, member.clone());
                }
            }
            ids.push(id.clone());
        }
        debug!(playlist = %loaded.playlist.name, members = ids.len(), "Validated playlist");
        ids_per_playlist.push(ids);
    }
    Ok(ids_per_playlist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(
            normalize(Path::new("./a/b/../c/./d")),
            PathBuf::from("a/c/d")
        );
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn templates_key_is_accepted() {
        let json = r#"[{"id":"p","name":"Templates","templates":["a"]}]"#;
        let playlists: Vec<Playlist> = serde_json::from_str(json).unwrap();
        assert_eq!(playlists[0].samples, vec!["a".to_string()]);
    }
}
