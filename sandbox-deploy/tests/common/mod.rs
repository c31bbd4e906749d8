#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

pub const SAMPLE_ID: &str = "3f2a1b0c-9d8e-4f7a-8b6c-5d4e3f2a1b0c";
pub const TEMPLATE_ID: &str = "7c6b5a49-3827-4160-9f5e-4d3c2b1a0f9e";
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

pub fn write(path: &Path, contents: impl AsRef<[u8]>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

pub fn sample_attributes() -> Value {
    json!(["itwin-version:4.x", "api-path:Viewer", "api-group-id:visualization"])
}

/// A gallery with one sample, one template and a `deploy.yaml` pointing at them.
pub struct Gallery {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl Gallery {
    pub fn new(sample_attributes: Value) -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let sample = root.join("Samples/viewer");
        write(
            &sample.join("config.json"),
            json!({
                "id": SAMPLE_ID,
                "name": "Basic viewer",
                "description": "Opens an iModel",
                "entry": "index.tsx",
                "files": ["index.tsx"],
                "commonFiles": ["viewer-setup"],
                "attributes": sample_attributes,
                "thumbnail": "thumbnail.png"
            })
            .to_string(),
        );
        write(&sample.join("index.tsx"), "import './App';\n");
        write(&sample.join("thumbnail.png"), PNG_BYTES);

        let template = root.join("Templates/starter");
        write(
            &template.join("config.json"),
            json!({
                "id": TEMPLATE_ID,
                "name": "Starter",
                "entry": "index.tsx",
                "files": ["index.tsx"],
                "attributes": ["itwin-version:4.x"]
            })
            .to_string(),
        );
        write(&template.join("index.tsx"), "export {};\n");

        write(
            &root.join("modules-v3.json"),
            json!([{ "name": "react", "external": true, "version": "18.2.0" }]).to_string(),
        );
        write(
            &root.join("common-files-config.json"),
            json!({
                "viewer-setup": {
                    "displayName": "Viewer setup",
                    "files": ["common/ViewerSetup.tsx"]
                }
            })
            .to_string(),
        );
        write(&root.join("common/ViewerSetup.tsx"), "export const setup = 1;\n");
        write(
            &root.join("sample-playlist.json"),
            json!([{
                "id": "samples",
                "name": "Samples",
                "description": "",
                "samples": ["Samples/viewer"]
            }])
            .to_string(),
        );
        write(
            &root.join("template-playlist.json"),
            json!([{
                "id": "templates",
                "name": "Templates",
                "description": "",
                "templates": ["Templates/starter"]
            }])
            .to_string(),
        );

        let config = root.join("deploy.yaml");
        let r = root.display();
        write(
            &config,
            format!(
                "samples:\n  root: {r}/Samples\n  playlist: {r}/sample-playlist.json\n\
                 \x20 modules: {r}/modules-v3.json\n\
                 \x20 common_files: {r}/common-files-config.json\n\
                 templates:\n  root: {r}/Templates\n  playlist: {r}/template-playlist.json\n\
                 \x20 modules: {r}/modules-v3.json\n\
                 upload:\n  delay_ms: 0\n  client_id: gallery-deployer\n"
            ),
        );

        Gallery { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
