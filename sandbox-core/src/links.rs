//! Links shared files into the sandboxes that reference them, for local development.
//!
//! Every linked file is also listed in the sandbox's `.gitignore` so the
//! shared copy stays the only one under version control.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::common_files::CommonFilesConfig;
use crate::config::SourceConfig;
use crate::error::ManifestError;
use crate::manifest::{discover_manifests, load_manifest};

#[derive(Debug, Default)]
pub struct LinkReport {
    pub links: Vec<PathBuf>,
    pub gitignore_entries: usize,
}

/// Links common files for every sandbox under `config.root`.
///
/// Does nothing when no common-files definition is configured.
pub fn link_common_files(config: &SourceConfig) -> Result<LinkReport, ManifestError> {
    let mut report = LinkReport::default();
    let Some(common_path) = config.common_files.as_deref() else {
        info!("No common files definition configured, nothing to link");
        return Ok(report);
    };
    let common = CommonFilesConfig::load(common_path)?;

    for config_path in discover_manifests(&config.root, &config.manifest_glob)? {
        let loaded = load_manifest(&config_path)?;
        let Some(names) = loaded.manifest.common_files.as_deref() else {
            continue;
        };
        for (set_name, set) in common.resolve(names, &loaded.config_path)? {
            for relative in &set.files {
                let target = common.file_path(relative);
                let Some(file_name) = Path::new(relative).file_name() else {
                    continue;
                };
                let link = loaded.sandbox_dir.join(file_name);
                link_file(&target, &link)?;
                debug!(
                    set = %set_name,
                    link = %link.display(),
                    target = %target.display(),
                    "Linked common file"
                );
                if append_gitignore(&loaded.sandbox_dir, &file_name.to_string_lossy())? {
                    report.gitignore_entries += 1;
                }
                report.links.push(link);
            }
        }
    }

    info!(
        links = report.links.len(),
        gitignore_entries = report.gitignore_entries,
        "Linked common files"
    );
    Ok(report)
}

fn link_file(target: &Path, link: &Path) -> Result<(), ManifestError> {
    let target = fs::canonicalize(target).map_err(|e| ManifestError::io(target, e))?;
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(link).map_err(|e| ManifestError::io(link, e))?;
        }
        // Only links are replaced; a sandbox's own file is never overwritten.
        Ok(_) => {
            error!(link = %link.display(), "Refusing to replace a file that is not a link");
            return Err(ManifestError::io(
                link,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "a file that is not a link already exists here",
                ),
            ));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(ManifestError::io(link, e)),
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(&target, link).map_err(|e| ManifestError::io(link, e))?;

    #[cfg(not(unix))]
    fs::copy(&target, link)
        .map(|_| ())
        .map_err(|e| ManifestError::io(link, e))?;

    Ok(())
}

/// Adds `entry` to `dir/.gitignore` unless already listed. Returns whether it was added.
pub fn append_gitignore(dir: &Path, entry: &str) -> Result<bool, ManifestError> {
    let path = dir.join(".gitignore");
    let existing = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ManifestError::io(&path, e)),
    };
    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(false);
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ManifestError::io(&path, e))?;
    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{separator}{entry}").map_err(|e| ManifestError::io(&path, e))?;
    Ok(true)
}
