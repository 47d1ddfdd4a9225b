//! End-to-end scenarios over the Migration Pipeline against a mocked target
//! catalog and universal-link service, mirroring the documented testable
//! properties: metadata-match skip, universal-link/search-fallback add, and
//! remix discrimination producing a miss.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_migrate::catalog::{HttpTargetCatalogClient, HttpUniversalLinkClient, SourceCatalogClient};
use catalog_migrate::download::DownloadOrchestrator;
use catalog_migrate::models::{MigrationOutcome, ResolutionSource, SourceTrack};
use catalog_migrate::pipeline::{MigrationPipeline, SourcePlaylistRef};
use catalog_migrate::rate_limit::SlidingWindowLimiter;
use catalog_migrate::MigrationConfig;

struct FixedSourceCatalog {
    tracks: Vec<SourceTrack>,
}

#[async_trait]
impl SourceCatalogClient for FixedSourceCatalog {
    async fn fetch_playlist_tracks(&self, _playlist_id: &str) -> anyhow::Result<Vec<SourceTrack>> {
        Ok(self.tracks.clone())
    }
}

fn test_config() -> MigrationConfig {
    MigrationConfig {
        migration_workers: 2,
        download_workers: 1,
        universal_link_rate_limit: 10,
        universal_link_window: Duration::from_secs(60),
        http_timeout: Duration::from_secs(5),
        downloader_tool: "true".to_string(),
        probe_tool: "ffprobe".to_string(),
        download_root: "./downloads".to_string(),
        log_root: std::env::temp_dir().to_string_lossy().into_owned(),
        source_name: "Spotify".to_string(),
        target_name: "Tidal".to_string(),
        duplicate_cleanup: true,
    }
}

fn levitating() -> SourceTrack {
    SourceTrack {
        source_id: "S1".to_string(),
        title: "Levitating".to_string(),
        artists: vec!["Dua Lipa".to_string()],
        album: "Future Nostalgia".to_string(),
        duration_ms: 203_000,
        track_number: Some(1),
        isrc: Some("GBAHS2000623".to_string()),
    }
}

async fn mount_empty_playlist(server: &MockServer, uuid: &str) {
    Mock::given(method("GET"))
        .and(path("/users/u1/playlists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{"uuid": uuid, "title": "Road Trip"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{uuid}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "etag-0")
                .set_body_json(serde_json::json!({"numberOfTracks": 0})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{uuid}/items")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalNumberOfItems": 0,
            "items": []
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/playlists/{uuid}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn build_pipeline(
    config: MigrationConfig,
    target_base: String,
    universal_link_base: String,
    source_tracks: Vec<SourceTrack>,
) -> MigrationPipeline {
    let source_client = Arc::new(FixedSourceCatalog { tracks: source_tracks });
    let target_client = Arc::new(HttpTargetCatalogClient::new(target_base, "u1", "target-token".to_string()));
    let limiter = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(60)));
    let universal_link_client = Arc::new(HttpUniversalLinkClient::new(universal_link_base, limiter));
    let (downloader, _download_events) = DownloadOrchestrator::new(config.downloader_tool.clone(), 1);
    let (events_tx, _events_rx) = tokio::sync::mpsc::unbounded_channel();

    MigrationPipeline::new(
        config,
        source_client,
        target_client,
        universal_link_client,
        Arc::new(downloader),
        events_tx,
    )
}

#[tokio::test]
async fn search_fallback_adds_a_track_when_universal_link_misses() {
    let target_server = MockServer::start().await;
    let link_server = MockServer::start().await;
    mount_empty_playlist(&target_server, "pl-1").await;

    Mock::given(method("GET"))
        .and(path("/links"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&link_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{
                "id": "200",
                "title": "Levitating",
                "artists": [{"name": "Dua Lipa"}],
                "duration": 203.0,
                "isrc": "GBAHS2000623"
            }]
        })))
        .mount(&target_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/playlists/pl-1/items"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "etag-1"))
        .mount(&target_server)
        .await;

    let pipeline = build_pipeline(
        test_config(),
        target_server.uri(),
        link_server.uri(),
        vec![levitating()],
    );

    let results = pipeline
        .run(vec![SourcePlaylistRef { id: "src-1".to_string(), name: "Road Trip".to_string() }])
        .await;

    assert_eq!(results.len(), 1);
    let reports = &results[0].reports;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].migration_status, MigrationOutcome::Added);
    assert_eq!(reports[0].resolution_source, Some(ResolutionSource::TargetSearch));
}

#[tokio::test]
async fn existing_item_is_skipped_via_metadata_match() {
    let target_server = MockServer::start().await;
    let link_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/u1/playlists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{"uuid": "pl-2", "title": "Road Trip"}]
        })))
        .mount(&target_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/playlists/pl-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "etag-0")
                .set_body_json(serde_json::json!({"numberOfTracks": 1})),
        )
        .mount(&target_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/playlists/pl-2/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalNumberOfItems": 1,
            "items": [{
                "item": {
                    "id": "200",
                    "title": "Levitating",
                    "artists": [{"name": "Dua Lipa"}],
                    "duration": 203.0,
                    "isrc": "GBAHS2000623"
                }
            }]
        })))
        .mount(&target_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/playlists/pl-2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&target_server)
        .await;

    let pipeline = build_pipeline(
        test_config(),
        target_server.uri(),
        link_server.uri(),
        vec![levitating()],
    );

    let results = pipeline
        .run(vec![SourcePlaylistRef { id: "src-1".to_string(), name: "Road Trip".to_string() }])
        .await;

    let reports = &results[0].reports;
    assert_eq!(reports[0].migration_status, MigrationOutcome::Skipped);
    assert_eq!(reports[0].resolution_source, Some(ResolutionSource::MetadataMatch));
}

#[tokio::test]
async fn remix_mismatch_is_not_found_when_search_has_no_other_candidate() {
    let target_server = MockServer::start().await;
    let link_server = MockServer::start().await;
    mount_empty_playlist(&target_server, "pl-3").await;

    Mock::given(method("GET"))
        .and(path("/links"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&link_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{
                "id": "300",
                "title": "Blinding Lights",
                "artists": [{"name": "The Weeknd"}],
                "duration": 240.0,
                "isrc": null
            }]
        })))
        .mount(&target_server)
        .await;

    let remix_track = SourceTrack {
        source_id: "S2".to_string(),
        title: "Blinding Lights (Chromatics Remix)".to_string(),
        artists: vec!["The Weeknd".to_string()],
        duration_ms: 240_000,
        track_number: Some(2),
        isrc: None,
        album: "After Hours".to_string(),
    };

    let pipeline = build_pipeline(
        test_config(),
        target_server.uri(),
        link_server.uri(),
        vec![remix_track],
    );

    let results = pipeline
        .run(vec![SourcePlaylistRef { id: "src-1".to_string(), name: "Road Trip".to_string() }])
        .await;

    let reports = &results[0].reports;
    assert_eq!(reports[0].migration_status, MigrationOutcome::NotFound);
}
