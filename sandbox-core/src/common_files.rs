//! Named sets of shared files (`common-files-config.json`) that sandboxes opt into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ManifestError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonFileSet {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub files: Vec<String>,
}

/// The full definition file, keyed by set name. File paths resolve against `base_dir`.
#[derive(Debug, Clone)]
pub struct CommonFilesConfig {
    pub base_dir: PathBuf,
    pub sets: BTreeMap<String, CommonFileSet>,
}

impl CommonFilesConfig {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
        let sets: BTreeMap<String, CommonFileSet> =
            serde_json::from_str(&raw).map_err(|e| ManifestError::json(path, e))?;
        info!(path = %path.display(), sets = sets.len(), "Loaded common files definition");
        Ok(CommonFilesConfig {
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            sets,
        })
    }

    /// Looks up each named set; `referrer` is only used for the error message.
    pub fn resolve<'a>(
        &'a self,
        names: &[String],
        referrer: &Path,
    ) -> Result<Vec<(&'a str, &'a CommonFileSet)>, ManifestError> {
        names
            .iter()
            .map(|name| {
                self.sets
                    .get_key_value(name.as_str())
                    .map(|(k, v)| (k.as_str(), v))
                    .ok_or_else(|| ManifestError::UnknownCommonFiles {
                        path: referrer.to_path_buf(),
                        name: name.clone(),
                    })
            })
            .collect()
    }

    pub fn file_path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CommonFilesConfig {
        let mut sets = BTreeMap::new();
        sets.insert(
            "viewer-setup".to_string(),
            CommonFileSet {
                display_name: "Viewer setup".into(),
                description: String::new(),
                files: vec!["common/ViewerSetup.tsx".into()],
            },
        );
        CommonFilesConfig {
            base_dir: PathBuf::from("/content"),
            sets,
        }
    }

    #[test]
    fn resolves_known_names_in_order() {
        let cfg = config();
        let resolved = cfg
            .resolve(&["viewer-setup".to_string()], Path::new("config.json"))
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "viewer-setup");
        assert_eq!(
            cfg.file_path(&resolved[0].1.files[0]),
            PathBuf::from("/content/common/ViewerSetup.tsx")
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = config()
            .resolve(&["nope".to_string()], Path::new("config.json"))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
