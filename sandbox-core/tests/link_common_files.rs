#![cfg(unix)]

use sandbox_core::config::SourceConfig;
use sandbox_core::error::ManifestError;
use sandbox_core::links::{append_gitignore, link_common_files};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write_json(path: &Path, value: serde_json::Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn workspace() -> (TempDir, SourceConfig) {
    let dir = tempdir().unwrap();
    let root = dir.path();

    write_json(
        &root.join("common-files-config.json"),
        json!({
            "viewer-setup": {
                "displayName": "Viewer setup",
                "files": ["common/ViewerSetup.tsx", "common/ViewerSetup.scss"]
            }
        }),
    );
    fs::create_dir_all(root.join("common")).unwrap();
    fs::write(root.join("common/ViewerSetup.tsx"), "export const setup = 1;\n").unwrap();
    fs::write(root.join("common/ViewerSetup.scss"), ".viewer {}\n").unwrap();

    write_json(
        &root.join("Samples/with-common/config.json"),
        json!({
            "id": "11111111-1111-4111-8111-111111111111",
            "name": "With common",
            "entry": "index.tsx",
            "files": ["index.tsx"],
            "commonFiles": ["viewer-setup"],
            "attributes": []
        }),
    );
    write_json(
        &root.join("Samples/plain/config.json"),
        json!({
            "id": "22222222-2222-4222-8222-222222222222",
            "name": "Plain",
            "entry": "index.tsx",
            "files": ["index.tsx"],
            "attributes": []
        }),
    );

    let config = SourceConfig {
        root: root.join("Samples"),
        playlist: root.join("sample-playlist.json"),
        modules: root.join("modules-v3.json"),
        common_files: Some(root.join("common-files-config.json")),
        manifest_glob: "**/config.json".into(),
    };
    (dir, config)
}

#[test]
fn test_links_common_files_into_referring_sandboxes() {
    let (dir, config) = workspace();
    let report = link_common_files(&config).expect("linking should succeed");

    let sandbox = dir.path().join("Samples/with-common");
    assert_eq!(report.links.len(), 2);
    assert_eq!(report.gitignore_entries, 2);

    let link = sandbox.join("ViewerSetup.tsx");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&link).unwrap(), "export const setup = 1;\n");

    let gitignore = fs::read_to_string(sandbox.join(".gitignore")).unwrap();
    assert_eq!(gitignore, "ViewerSetup.tsx\nViewerSetup.scss\n");

    assert!(!dir.path().join("Samples/plain/ViewerSetup.tsx").exists());
    assert!(!dir.path().join("Samples/plain/.gitignore").exists());
}

#[test]
fn test_relinking_is_idempotent() {
    let (dir, config) = workspace();
    link_common_files(&config).unwrap();
    let second = link_common_files(&config).unwrap();

    assert_eq!(second.links.len(), 2);
    assert_eq!(second.gitignore_entries, 0);
    let gitignore =
        fs::read_to_string(dir.path().join("Samples/with-common/.gitignore")).unwrap();
    assert_eq!(gitignore.lines().count(), 2);
}

#[test]
fn test_without_common_files_definition_nothing_is_linked() {
    let (_dir, mut config) = workspace();
    config.common_files = None;
    let report = link_common_files(&config).unwrap();
    assert!(report.links.is_empty());
}

#[test]
fn test_append_gitignore_preserves_existing_lines() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".gitignore"), "node_modules").unwrap();

    assert!(append_gitignore(dir.path(), "shared.ts").unwrap());
    assert!(!append_gitignore(dir.path(), "node_modules").unwrap());

    let gitignore = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
    assert_eq!(gitignore, "node_modules\nshared.ts\n");
}

#[test]
fn test_real_file_in_the_way_is_kept_and_reported() {
    let (dir, config) = workspace();
    let own = dir.path().join("Samples/with-common/ViewerSetup.tsx");
    fs::write(&own, "export const mine = true;\n").unwrap();

    let err = link_common_files(&config).unwrap_err();
    match err {
        ManifestError::Io { path, source } => {
            assert_eq!(path, own);
            assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
        }
        other => panic!("Expected AlreadyExists, got: {other}"),
    }

    assert!(!fs::symlink_metadata(&own).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&own).unwrap(), "export const mine = true;\n");
}
