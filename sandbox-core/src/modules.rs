//! The shared module list (`modules-v3.json`) and per-sandbox overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ManifestError;

/// One package a sandbox is built against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub external: bool,
    pub version: String,
}

pub fn load_modules(path: &Path) -> Result<Vec<Module>, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
    let modules: Vec<Module> =
        serde_json::from_str(&raw).map_err(|e| ManifestError::json(path, e))?;
    info!(path = %path.display(), count = modules.len(), "Loaded module list");
    Ok(modules)
}

/// Applies `overrides` on top of `base`.
///
/// An override replaces the base entry with the same name and moves it to the
/// end; overrides for names absent from `base` are appended.
pub fn merge_modules(base: &[Module], overrides: Option<&[Module]>) -> Vec<Module> {
    let mut merged = base.to_vec();
    let Some(overrides) = overrides else {
        return merged;
    };

    for module in overrides {
        merged.retain(|m| m.name != module.name);
        debug!(name = %module.name, version = %module.version, "Applying module override");
        merged.push(module.clone());
    }
    merged
}
