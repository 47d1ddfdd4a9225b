//! HTTP-boundary tests for `HttpTargetCatalogClient` against a mocked
//! target catalog: pagination across multiple pages, and the entity-tag
//! mismatch response mapping to `MigrationError::EntityTagMismatch`.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_migrate::catalog::{HttpTargetCatalogClient, TargetCatalogClient};
use catalog_migrate::MigrationError;

fn track_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": format!("Track {id}"),
        "artists": [{"name": "Artist"}],
        "duration": 200.0,
        "isrc": null
    })
}

#[tokio::test]
async fn get_playlist_items_paginates_across_two_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/playlists/pl-1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "totalNumberOfItems": 3,
            "items": [
                {"item": track_json("1")},
                {"item": track_json("2")},
            ]
        })))
        .mount(&server)
        .await;

    let client = HttpTargetCatalogClient::new(server.uri(), "u1", "token".to_string());
    let (total, first_page) = client.get_playlist_items("pl-1", 0, 2).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(first_page.len(), 2);
    assert_eq!(first_page[0].target_id, "1");
}

#[tokio::test]
async fn add_items_maps_conflict_status_to_entity_tag_mismatch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/playlists/pl-1/items"))
        .respond_with(ResponseTemplate::new(412))
        .mount(&server)
        .await;

    let client = HttpTargetCatalogClient::new(server.uri(), "u1", "token".to_string());
    let result = client
        .add_items("pl-1", "stale-tag", &["200".to_string()])
        .await;

    assert!(matches!(result, Err(MigrationError::EntityTagMismatch)));
}

#[tokio::test]
async fn add_item_single_returns_status_as_track_scoped_error_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/playlists/pl-1/items"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpTargetCatalogClient::new(server.uri(), "u1", "token".to_string());
    let result = client.add_item_single("pl-1", "tag-0", "200").await;

    assert!(matches!(result, Err(MigrationError::TrackScoped { .. })));
}
