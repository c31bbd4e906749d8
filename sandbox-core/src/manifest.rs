//! Sandbox manifests (`config.json`): loading, discovery and validation.

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, error, info};

use crate::error::ManifestError;
use crate::modules::Module;

/// Directories never descended into while looking for manifests.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// An iModel a sandbox opens by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IModelRef {
    pub i_twin_id: String,
    pub i_model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The `config.json` describing one sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxManifest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub entry: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub common_files: Option<Vec<String>>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub modules: Option<Vec<Module>>,
    #[serde(default, rename = "iModels")]
    pub i_models: Option<Vec<IModelRef>>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// A manifest together with where it was read from.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub manifest: SandboxManifest,
    pub config_path: PathBuf,
    pub sandbox_dir: PathBuf,
}

pub fn load_manifest(config_path: &Path) -> Result<LoadedManifest, ManifestError> {
    let raw = fs::read_to_string(config_path).map_err(|e| ManifestError::io(config_path, e))?;
    let manifest: SandboxManifest =
        serde_json::from_str(&raw).map_err(|e| ManifestError::json(config_path, e))?;
    let sandbox_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    debug!(path = %config_path.display(), id = %manifest.id, "Loaded manifest");
    Ok(LoadedManifest {
        manifest,
        config_path: config_path.to_path_buf(),
        sandbox_dir,
    })
}

/// Finds every file under `root` whose root-relative path matches `pattern`.
///
/// Results are sorted so deploy order is stable between runs.
pub fn discover_manifests(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, ManifestError> {
    let matcher = Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|source| ManifestError::Glob {
            pattern: pattern.to_string(),
            source,
        })?;

    fn visit_dir(
        dir: &Path,
        root: &Path,
        matcher: &GlobMatcher,
        results: &mut Vec<PathBuf>,
    ) -> Result<(), ManifestError> {
        let entries = fs::read_dir(dir).map_err(|e| ManifestError::io(dir, e))?;
        for entry_res in entries {
            let entry = entry_res.map_err(|e| ManifestError::io(dir, e))?;
            let path = entry.path();
            // Symlinked directories are not followed; a link cycle would never end.
            let file_type = entry.file_type().map_err(|e| ManifestError::io(&path, e))?;
            if file_type.is_dir() {
                let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if SKIPPED_DIRS.contains(&file_name) {
                    debug!(path = %path.display(), "Skipping directory");
                    continue;
                }
                visit_dir(&path, root, matcher, results)?;
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                let Ok(rel_path) = path.strip_prefix(root) else {
                    continue;
                };
                if matcher.is_match(rel_path) {
                    results.push(path);
                }
            }
        }
        Ok(())
    }

    let mut results = Vec::new();
    if let Err(e) = visit_dir(root, root, &matcher, &mut results) {
        error!(error = %e, root = %root.display(), "Failed to scan for manifests");
        return Err(e);
    }
    results.sort();
    info!(root = %root.display(), count = results.len(), "Discovered manifests");
    Ok(results)
}

fn guid_regex() -> &'static Regex {
    static GUID: OnceLock<Regex> = OnceLock::new();
    GUID.get_or_init(|| {
        Regex::new(
            r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$",
        )
        .expect("GUID pattern is a valid regex")
    })
}

pub fn is_valid_guid(id: &str) -> bool {
    guid_regex().is_match(id)
}

/// Checks the manifest declares an attribute for each of `required_prefixes`.
pub fn validate_attributes(
    loaded: &LoadedManifest,
    required_prefixes: &[&str],
) -> Result<(), ManifestError> {
    for prefix in required_prefixes {
        let present = loaded
            .manifest
            .attributes
            .iter()
            .any(|attr| attr.starts_with(prefix));
        if !present {
            return Err(ManifestError::MissingAttribute {
                path: loaded.config_path.clone(),
                prefix: (*prefix).to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_id(loaded: &LoadedManifest) -> Result<(), ManifestError> {
    if is_valid_guid(&loaded.manifest.id) {
        Ok(())
    } else {
        Err(ManifestError::InvalidGuid {
            path: loaded.config_path.clone(),
            id: loaded.manifest.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(attributes: &[&str]) -> LoadedManifest {
        LoadedManifest {
            manifest: SandboxManifest {
                id: "6a3c5e2f-0d1b-4c7a-9e8f-1b2c3d4e5f60".into(),
                name: "Test".into(),
                description: String::new(),
                entry: "index.tsx".into(),
                files: vec![],
                common_files: None,
                attributes: attributes.iter().map(|s| s.to_string()).collect(),
                modules: None,
                i_models: None,
                thumbnail: None,
            },
            config_path: PathBuf::from("Samples/test/config.json"),
            sandbox_dir: PathBuf::from("Samples/test"),
        }
    }

    #[test]
    fn guid_pattern_accepts_v4_in_any_case() {
        assert!(is_valid_guid("6a3c5e2f-0d1b-4c7a-9e8f-1b2c3d4e5f60"));
        assert!(is_valid_guid("6A3C5E2F-0D1B-4C7A-9E8F-1B2C3D4E5F60"));
    }

    #[test]
    fn guid_pattern_rejects_bad_version_and_variant() {
        assert!(!is_valid_guid("6a3c5e2f-0d1b-6c7a-9e8f-1b2c3d4e5f60"));
        assert!(!is_valid_guid("6a3c5e2f-0d1b-4c7a-7e8f-1b2c3d4e5f60"));
        assert!(!is_valid_guid("not-a-guid"));
        assert!(!is_valid_guid(" 6a3c5e2f-0d1b-4c7a-9e8f-1b2c3d4e5f60"));
    }

    #[test]
    fn attributes_pass_when_every_prefix_is_present() {
        let m = loaded(&["itwin-version:3.x", "api-path:Viewer", "api-group-id:viz"]);
        assert!(validate_attributes(&m, crate::config::SAMPLE_ATTRIBUTE_PREFIXES).is_ok());
    }

    #[test]
    fn missing_api_path_is_reported() {
        let m = loaded(&["itwin-version:3.x", "api-group-id:viz"]);
        let err = validate_attributes(&m, crate::config::SAMPLE_ATTRIBUTE_PREFIXES).unwrap_err();
        match err {
            ManifestError::MissingAttribute { prefix, .. } => assert_eq!(prefix, "api-path:"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn templates_only_need_itwin_version() {
        let m = loaded(&["itwin-version:4.x"]);
        assert!(validate_attributes(&m, crate::config::TEMPLATE_ATTRIBUTE_PREFIXES).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn discovery_does_not_follow_directory_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = dir.path().join("viewer");
        fs::create_dir_all(&sandbox).unwrap();
        fs::write(sandbox.join("config.json"), "{}").unwrap();
        std::os::unix::fs::symlink(dir.path(), sandbox.join("loop")).unwrap();

        let found = discover_manifests(dir.path(), "**/config.json").unwrap();
        assert_eq!(found, vec![sandbox.join("config.json")]);
    }
}
