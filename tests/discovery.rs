//! Integration tests for the discovery routine: additive-only registry
//! updates driven by a mocked catalog listing.
//!
//! Each test gets its own mock server and scratch directory, so tests are
//! fully isolated and never touch the real API.

use nrkcast::{run_discovery, CatalogClient, Config, DiscoveryError, Registry, ShowKind};
use pretty_assertions::assert_eq;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server_uri: &str, dir: &Path) -> Config {
    Config {
        api_base_url: server_uri.to_string(),
        registry_path: dir.join("programs.json"),
        audio_feeds_dir: dir.join("rss/audio"),
        video_feeds_dir: dir.join("rss/video"),
        chapters_dir: dir.join("chapters"),
        ..Config::default()
    }
}

async fn mount_listing(server: &MockServer, series: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/radio/search/categories/podcast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "series": series
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_discovery_adds_untracked_shows() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());

    // Registry starts with only "a"
    std::fs::write(
        &config.registry_path,
        r#"[{"id":"a","title":"Kept Title","type":"audio","enabled":false}]"#,
    )
    .unwrap();

    mount_listing(
        &server,
        serde_json::json!([
            {"seriesId": "a", "title": "Catalog Title A", "type": "podcast"},
            {"seriesId": "b", "title": "Show B", "type": "podcast"}
        ]),
    )
    .await;

    let client = CatalogClient::new(&server.uri()).unwrap();
    let report = run_discovery(&client, &config.registry_path, &config)
        .await
        .unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.listed, 2);

    let registry = Registry::load(&config.registry_path).unwrap();
    let ids: Vec<&str> = registry.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    // The existing entry's manually curated fields are preserved verbatim
    let a = &registry.entries()[0];
    assert_eq!(a.title, "Kept Title");
    assert!(!a.enabled);

    // New entries pick up catalog metadata and the configured policy
    let b = &registry.entries()[1];
    assert_eq!(b.title, "Show B");
    assert_eq!(b.kind, ShowKind::Audio);
    assert!(b.enabled); // auto_enable_audio defaults to true
}

#[tokio::test]
async fn test_discovery_is_idempotent() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_listing(
        &server,
        serde_json::json!([{"seriesId": "a", "title": "Show A", "type": "podcast"}]),
    )
    .await;

    let client = CatalogClient::new(&server.uri()).unwrap();
    let first = run_discovery(&client, &config.registry_path, &config)
        .await
        .unwrap();
    assert_eq!(first.added, 1);
    let after_first = std::fs::read_to_string(&config.registry_path).unwrap();

    let second = run_discovery(&client, &config.registry_path, &config)
        .await
        .unwrap();
    assert_eq!(second.added, 0);
    let after_second = std::fs::read_to_string(&config.registry_path).unwrap();
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_video_shows_never_auto_discovered() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());

    mount_listing(
        &server,
        serde_json::json!([
            {"seriesId": "tv-show", "title": "TV Show", "type": "tv"},
            {"seriesId": "pod", "title": "Podcast", "type": "podcast"}
        ]),
    )
    .await;

    let client = CatalogClient::new(&server.uri()).unwrap();
    let report = run_discovery(&client, &config.registry_path, &config)
        .await
        .unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.skipped_video, 1);

    let registry = Registry::load(&config.registry_path).unwrap();
    assert_eq!(registry.entries().len(), 1);
    assert_eq!(registry.entries()[0].id, "pod");
}

#[tokio::test]
async fn test_listing_failure_leaves_registry_untouched() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());

    let original = r#"[{"id":"a","title":"A","type":"audio","enabled":true}]"#;
    std::fs::write(&config.registry_path, original).unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = CatalogClient::new(&server.uri()).unwrap();
    let err = run_discovery(&client, &config.registry_path, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Catalog(_)));

    // The file is byte-for-byte what it was
    let content = std::fs::read_to_string(&config.registry_path).unwrap();
    assert_eq!(content, original);
}

#[tokio::test]
async fn test_corrupt_registry_aborts_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());

    std::fs::write(&config.registry_path, "{definitely not json").unwrap();
    mount_listing(
        &server,
        serde_json::json!([{"seriesId": "a", "title": "A", "type": "podcast"}]),
    )
    .await;

    let client = CatalogClient::new(&server.uri()).unwrap();
    let err = run_discovery(&client, &config.registry_path, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Registry(_)));

    // No rewrite attempted on top of the corrupt file
    let content = std::fs::read_to_string(&config.registry_path).unwrap();
    assert_eq!(content, "{definitely not json");
}

#[tokio::test]
async fn test_manual_activation_policy() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&server.uri(), dir.path());
    config.auto_enable_audio = false;

    mount_listing(
        &server,
        serde_json::json!([{"seriesId": "a", "title": "A", "type": "podcast"}]),
    )
    .await;

    let client = CatalogClient::new(&server.uri()).unwrap();
    run_discovery(&client, &config.registry_path, &config)
        .await
        .unwrap();

    let registry = Registry::load(&config.registry_path).unwrap();
    assert!(!registry.entries()[0].enabled);
}
