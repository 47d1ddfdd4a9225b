use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::MigrationError;
use crate::models::TargetTrack;

/// One page-independent summary of an existing target playlist: its id,
/// title, and entity tag.
#[derive(Debug, Clone)]
pub struct PlaylistSummary {
    pub uuid: String,
    pub title: String,
}

/// A playlist's current item count and entity tag, as returned by a single
/// `GET playlists/{uuid}`.
#[derive(Debug, Clone)]
pub struct PlaylistSnapshot {
    pub entity_tag: String,
    pub total_items: u64,
}

/// Mutating access to the target catalog: find/create/list playlists, page
/// their items, add/remove items under optimistic concurrency, search
/// tracks. Mirrors the teacher's `TidalSyncWorker` shape (client + token +
/// `api_request`) generalized to the write paths this crate needs.
#[async_trait]
pub trait TargetCatalogClient: Send + Sync {
    async fn list_playlists(&self, page_offset: u64, page_limit: u64)
        -> Result<Vec<PlaylistSummary>>;

    async fn create_playlist(&self, title: &str, description: &str) -> Result<String>;

    async fn get_playlist(&self, uuid: &str) -> Result<PlaylistSnapshot>;

    async fn get_playlist_items(
        &self,
        uuid: &str,
        offset: u64,
        limit: u64,
    ) -> Result<(u64, Vec<TargetTrack>)>;

    /// Batch add with duplicate policy `SKIP`, guarded by `If-None-Match`.
    /// Returns `MigrationError::EntityTagMismatch` on a stale tag so the
    /// caller can fall back to the per-item path.
    async fn add_items(
        &self,
        uuid: &str,
        entity_tag: &str,
        target_ids: &[String],
    ) -> std::result::Result<(), MigrationError>;

    /// Adds a single item, returning the playlist's new entity tag.
    async fn add_item_single(
        &self,
        uuid: &str,
        entity_tag: &str,
        target_id: &str,
    ) -> std::result::Result<String, MigrationError>;

    /// Deletes items at the given zero-based indices. Caller must pass
    /// indices sorted descending so earlier ones stay valid.
    async fn delete_items(
        &self,
        uuid: &str,
        entity_tag: &str,
        indices_descending: &[usize],
    ) -> std::result::Result<(), MigrationError>;

    async fn update_playlist(
        &self,
        uuid: &str,
        entity_tag: &str,
        title: &str,
        description: &str,
    ) -> std::result::Result<(), MigrationError>;

    async fn search_tracks(&self, query: &str) -> Result<Vec<TargetTrack>>;
}

#[derive(Deserialize)]
struct ListPlaylistsResponse {
    items: Vec<RemotePlaylistSummary>,
}

#[derive(Deserialize)]
struct RemotePlaylistSummary {
    uuid: String,
    title: String,
}

#[derive(Deserialize)]
struct CreatePlaylistResponse {
    uuid: Option<String>,
}

#[derive(Deserialize)]
struct ItemsResponse {
    #[serde(rename = "totalNumberOfItems")]
    total_number_of_items: u64,
    items: Vec<RemoteItem>,
}

#[derive(Deserialize)]
struct RemoteItem {
    item: RemoteTargetTrack,
}

#[derive(Deserialize)]
struct RemoteTargetTrack {
    id: String,
    title: String,
    artists: Vec<RemoteArtist>,
    #[serde(default)]
    album: Option<RemoteAlbum>,
    duration: f64,
    isrc: Option<String>,
}

#[derive(Deserialize)]
struct RemoteAlbum {
    title: String,
}

#[derive(Deserialize)]
struct RemoteArtist {
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<RemoteTargetTrack>,
}

impl From<RemoteTargetTrack> for TargetTrack {
    fn from(t: RemoteTargetTrack) -> Self {
        TargetTrack {
            target_id: t.id,
            title: t.title,
            artists: t.artists.into_iter().map(|a| a.name).collect(),
            album: t.album.map(|a| a.title).unwrap_or_default(),
            duration_seconds: t.duration,
            isrc: t.isrc,
        }
    }
}

/// `reqwest`-backed client against a target catalog with the Tidal-style
/// entity-tag/optimistic-concurrency write protocol.
pub struct HttpTargetCatalogClient {
    client: Client,
    api_base: String,
    user_id: String,
    bearer_token: String,
}

impl HttpTargetCatalogClient {
    pub fn new(api_base: impl Into<String>, user_id: impl Into<String>, bearer_token: String) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            user_id: user_id.into(),
            bearer_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

#[async_trait]
impl TargetCatalogClient for HttpTargetCatalogClient {
    async fn list_playlists(
        &self,
        page_offset: u64,
        page_limit: u64,
    ) -> Result<Vec<PlaylistSummary>> {
        let url = self.url(&format!(
            "/users/{}/playlists?limit={page_limit}&offset={page_offset}",
            self.user_id
        ));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("target catalog list-playlists request failed")?;
        let body: ListPlaylistsResponse = response
            .json()
            .await
            .context("failed to parse target playlist list")?;
        Ok(body
            .items
            .into_iter()
            .map(|p| PlaylistSummary {
                uuid: p.uuid,
                title: p.title,
            })
            .collect())
    }

    async fn create_playlist(&self, title: &str, description: &str) -> Result<String> {
        let url = self.url(&format!("/users/{}/playlists", self.user_id));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .form(&[("title", title), ("description", description)])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("target catalog create-playlist request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("target catalog create-playlist error: {status} - {body}");
        }

        let body: CreatePlaylistResponse = response
            .json()
            .await
            .context("failed to parse create-playlist response")?;

        match body.uuid {
            Some(uuid) => Ok(uuid),
            // Response shape omitted the uuid: fall back to listing and
            // matching the title we just created, per the mutator contract.
            None => {
                let mut offset = 0;
                loop {
                    let page = self.list_playlists(offset, 50).await?;
                    if page.is_empty() {
                        anyhow::bail!("created playlist '{title}' not found on relist");
                    }
                    if let Some(found) = page.iter().find(|p| p.title == title) {
                        return Ok(found.uuid.clone());
                    }
                    offset += 50;
                }
            }
        }
    }

    async fn get_playlist(&self, uuid: &str) -> Result<PlaylistSnapshot> {
        let url = self.url(&format!("/playlists/{uuid}"));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("target catalog get-playlist request failed")?;

        let entity_tag = response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        #[derive(Deserialize)]
        struct PlaylistMeta {
            #[serde(rename = "numberOfTracks")]
            number_of_tracks: Option<u64>,
        }
        let meta: PlaylistMeta = response
            .json()
            .await
            .context("failed to parse get-playlist response")?;

        Ok(PlaylistSnapshot {
            entity_tag,
            total_items: meta.number_of_tracks.unwrap_or(0),
        })
    }

    async fn get_playlist_items(
        &self,
        uuid: &str,
        offset: u64,
        limit: u64,
    ) -> Result<(u64, Vec<TargetTrack>)> {
        let url = self.url(&format!("/playlists/{uuid}/items?limit={limit}&offset={offset}"));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("target catalog get-items request failed")?;

        let body: ItemsResponse = response
            .json()
            .await
            .context("failed to parse playlist items response")?;

        Ok((
            body.total_number_of_items,
            body.items.into_iter().map(|i| i.item.into()).collect(),
        ))
    }

    async fn add_items(
        &self,
        uuid: &str,
        entity_tag: &str,
        target_ids: &[String],
    ) -> std::result::Result<(), MigrationError> {
        let url = self.url(&format!("/playlists/{uuid}/items"));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .header("If-None-Match", entity_tag)
            .form(&[
                ("trackIds", target_ids.join(",")),
                ("onDuplicates", "SKIP".to_string()),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| MigrationError::transient(e))?;

        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED
            || response.status() == reqwest::StatusCode::CONFLICT
        {
            return Err(MigrationError::EntityTagMismatch);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(MigrationError::TrackScoped {
                reason: format!("add-items failed with status {status}"),
            });
        }
        Ok(())
    }

    async fn add_item_single(
        &self,
        uuid: &str,
        entity_tag: &str,
        target_id: &str,
    ) -> std::result::Result<String, MigrationError> {
        let url = self.url(&format!("/playlists/{uuid}/items"));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .header("If-None-Match", entity_tag)
            .form(&[
                ("trackIds", target_id.to_string()),
                ("onDuplicates", "SKIP".to_string()),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| MigrationError::transient(e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(MigrationError::TrackScoped {
                reason: format!("add-item {target_id} failed with status {status}"),
            });
        }

        let new_tag = response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or(entity_tag)
            .to_string();
        Ok(new_tag)
    }

    async fn delete_items(
        &self,
        uuid: &str,
        entity_tag: &str,
        indices_descending: &[usize],
    ) -> std::result::Result<(), MigrationError> {
        let indices = indices_descending
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = self.url(&format!("/playlists/{uuid}/items/{indices}"));
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.bearer_token)
            .header("If-None-Match", entity_tag)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| MigrationError::transient(e))?;

        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Err(MigrationError::EntityTagMismatch);
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(MigrationError::PlaylistScoped {
                playlist: uuid.to_string(),
                reason: format!("delete-items failed with status {status}"),
            });
        }
        Ok(())
    }

    async fn update_playlist(
        &self,
        uuid: &str,
        entity_tag: &str,
        title: &str,
        description: &str,
    ) -> std::result::Result<(), MigrationError> {
        let url = self.url(&format!("/playlists/{uuid}"));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .header("If-None-Match", entity_tag)
            .form(&[("title", title), ("description", description)])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| MigrationError::transient(e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(MigrationError::PlaylistScoped {
                playlist: uuid.to_string(),
                reason: format!("update-playlist failed with status {status}"),
            });
        }
        Ok(())
    }

    async fn search_tracks(&self, query: &str) -> Result<Vec<TargetTrack>> {
        let encoded = urlencoding::encode(query);
        let url = self.url(&format!("/search?query={encoded}&limit=10"));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("target catalog search request failed")?;

        let body: SearchResponse = response
            .json()
            .await
            .context("failed to parse search response")?;

        Ok(body.items.into_iter().map(Into::into).collect())
    }
}
