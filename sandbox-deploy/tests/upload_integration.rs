mod common;

use common::{Gallery, SAMPLE_ID, TEMPLATE_ID};
use sandbox_core::config::SandboxKind;
use sandbox_deploy::load_config::{load_config, CliConfig};
use sandbox_deploy::{deploy, DeployTarget};
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "deploy-token";

fn config(gallery: &Gallery, playlist_user: Option<&str>) -> CliConfig {
    std::env::remove_var("DEPLOY_CLIENT_ID");
    std::env::remove_var("DEPLOY_SCOPE");
    std::env::remove_var("DEPLOY_PLAYLIST_USER");
    let mut config = load_config(Some(&gallery.config)).expect("Config should load");
    config.upload.playlist_user = playlist_user.map(str::to_string);
    config
}

fn target(server: &MockServer) -> DeployTarget {
    DeployTarget {
        base_url: server.uri(),
        authority: server.uri(),
        client_secret: "s3cret".into(),
    }
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=gallery-deployer"))
        .and(body_string_contains("client_secret=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TOKEN,
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn bearer() -> wiremock::matchers::HeaderExactMatcher {
    header("authorization", format!("Bearer {TOKEN}").as_str())
}

#[tokio::test]
#[serial]
async fn test_samples_deploy_uploads_everything_with_bearer_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/optionalFiles"))
        .and(bearer())
        .and(body_partial_json(json!([{ "name": "viewer-setup", "displayName": "Viewer setup" }])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/sample"))
        .and(bearer())
        .and(body_partial_json(json!({
            "id": SAMPLE_ID,
            "name": "Basic viewer",
            "files": { "index.tsx": { "encoding": "utf8" } }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/codeshare/{SAMPLE_ID}/thumbnail")))
        .and(bearer())
        .and(body_partial_json(json!({ "contentType": "image/png" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/user/gallery-owner/playlist"))
        .and(bearer())
        .and(body_partial_json(json!({ "id": "samples", "sandboxIds": [SAMPLE_ID] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gallery = Gallery::new(common::sample_attributes());
    let config = config(&gallery, Some("gallery-owner"));

    let report = deploy(SandboxKind::Sample, &config.samples, &target(&server), &config.upload)
        .await
        .expect("Deploy should succeed");

    assert_eq!(report.uploaded, vec![SAMPLE_ID.to_string()]);
    assert_eq!(report.thumbnails, 1);
    assert_eq!(report.playlists, 1);
    assert!(report.success());
}

#[tokio::test]
#[serial]
async fn test_templates_deploy_to_id_path_and_skip_playlists_without_owner() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("PUT"))
        .and(path(format!("/api/template/{TEMPLATE_ID}")))
        .and(bearer())
        .and(body_partial_json(json!({ "id": TEMPLATE_ID, "entry": "index.tsx" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/optionalFiles"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gallery = Gallery::new(common::sample_attributes());
    let config = config(&gallery, None);

    let report = deploy(
        SandboxKind::Template,
        &config.templates,
        &target(&server),
        &config.upload,
    )
    .await
    .expect("Deploy should succeed");

    assert_eq!(report.uploaded, vec![TEMPLATE_ID.to_string()]);
    assert_eq!(report.playlists, 0);
}

#[tokio::test]
#[serial]
async fn test_failed_sample_upload_fails_the_run_but_continues() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/optionalFiles"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/sample"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/codeshare/{SAMPLE_ID}/thumbnail")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/user/gallery-owner/playlist"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gallery = Gallery::new(common::sample_attributes());
    let config = config(&gallery, Some("gallery-owner"));

    let err = deploy(SandboxKind::Sample, &config.samples, &target(&server), &config.upload)
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("1 of the sample upload(s) failed"),
        "Unexpected error: {err}"
    );
}

#[tokio::test]
#[serial]
async fn test_rejected_credentials_stop_before_uploading() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_client" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gallery = Gallery::new(common::sample_attributes());
    let config = config(&gallery, Some("gallery-owner"));

    let err = deploy(SandboxKind::Sample, &config.samples, &target(&server), &config.upload)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"), "Unexpected error: {err}");
}
