//! Target Playlist Mutator: find-or-create by title, page through existing
//! items, add/delete items under optimistic concurrency with a batch/
//! one-by-one fallback, and post-migration duplicate removal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;

use crate::catalog::TargetCatalogClient;
use crate::error::MigrationError;
use crate::models::{PlaylistItem, TargetPlaylist, TargetTrack};

/// Page size used when listing a user's playlists to find-or-reuse one by
/// title.
const PLAYLIST_PAGE_SIZE: u64 = 50;
/// Page size used when fetching an existing playlist's items.
const ITEM_PAGE_SIZE: u64 = 100;
/// Items per delete batch.
const DELETE_BATCH_SIZE: usize = 50;
/// Sleep applied every 10 single-item adds to stay under an implicit
/// per-item rate limit.
const SINGLE_ADD_SLEEP_EVERY: usize = 10;
const SINGLE_ADD_SLEEP: Duration = Duration::from_millis(250);

pub struct TargetPlaylistMutator {
    client: Arc<dyn TargetCatalogClient>,
}

impl TargetPlaylistMutator {
    pub fn new(client: Arc<dyn TargetCatalogClient>) -> Self {
        Self { client }
    }

    /// Finds the first playlist whose title equals `title` exactly
    /// (case-sensitive), paginating in pages of 50. Creates one with the
    /// given description if none matches, then fetches its snapshot either
    /// way.
    pub async fn find_or_create(&self, title: &str, description: &str) -> Result<TargetPlaylist> {
        let mut offset = 0;
        loop {
            let page = self
                .client
                .list_playlists(offset, PLAYLIST_PAGE_SIZE)
                .await
                .context("failed to list target playlists")?;
            if page.is_empty() {
                break;
            }
            if let Some(found) = page.iter().find(|p| p.title == title) {
                return self.load_snapshot(&found.uuid, title, description).await;
            }
            offset += PLAYLIST_PAGE_SIZE;
        }

        let uuid = self
            .client
            .create_playlist(title, description)
            .await
            .context("failed to create target playlist")?;
        self.load_snapshot(&uuid, title, description).await
    }

    /// Pages through a playlist's items (limit 100) until `offset >=
    /// totalNumberOfItems`. Logs a warning on a size mismatch rather than
    /// aborting.
    async fn load_snapshot(
        &self,
        uuid: &str,
        title: &str,
        description: &str,
    ) -> Result<TargetPlaylist> {
        let meta = self
            .client
            .get_playlist(uuid)
            .await
            .context("failed to fetch target playlist metadata")?;

        let mut items = Vec::new();
        let mut offset = 0u64;
        loop {
            let (total, page) = self
                .client
                .get_playlist_items(uuid, offset, ITEM_PAGE_SIZE)
                .await
                .context("failed to fetch target playlist items")?;
            let page_len = page.len() as u64;
            for track in page {
                items.push(PlaylistItem {
                    index: items.len(),
                    track,
                });
            }
            offset += ITEM_PAGE_SIZE;
            if offset >= total {
                if items.len() as u64 != total {
                    tracing::warn!(
                        playlist = %uuid,
                        expected = total,
                        actual = items.len(),
                        "playlist item count mismatch after pagination"
                    );
                }
                break;
            }
            if page_len == 0 {
                break;
            }
        }

        Ok(TargetPlaylist {
            uuid: uuid.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            entity_tag: meta.entity_tag,
            items,
        })
    }

    /// Adds `target_ids` as one batch under the playlist's current entity
    /// tag. On any non-2xx (including a stale tag), falls back to adding
    /// each id singly, refreshing the tag before every single add. Returns
    /// the final entity tag and the list of ids that still failed.
    pub async fn add_items(
        &self,
        playlist: &mut TargetPlaylist,
        target_ids: &[TargetTrack],
    ) -> Result<Vec<String>> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = target_ids.iter().map(|t| t.target_id.clone()).collect();
        match self
            .client
            .add_items(&playlist.uuid, &playlist.entity_tag, &ids)
            .await
        {
            Ok(()) => {
                let refreshed = self
                    .client
                    .get_playlist(&playlist.uuid)
                    .await
                    .context("failed to refresh entity tag after batch add")?;
                playlist.entity_tag = refreshed.entity_tag;
                for track in target_ids {
                    if !playlist.contains_target_id(&track.target_id) {
                        playlist.push_added(track.clone());
                    }
                }
                Ok(Vec::new())
            }
            Err(_) => self.add_items_one_by_one(playlist, target_ids).await,
        }
    }

    async fn add_items_one_by_one(
        &self,
        playlist: &mut TargetPlaylist,
        target_ids: &[TargetTrack],
    ) -> Result<Vec<String>> {
        let mut failures = Vec::new();
        for (count, track) in target_ids.iter().enumerate() {
            let fresh_tag = self
                .client
                .get_playlist(&playlist.uuid)
                .await
                .context("failed to refresh entity tag before single add")?
                .entity_tag;

            match self
                .client
                .add_item_single(&playlist.uuid, &fresh_tag, &track.target_id)
                .await
            {
                Ok(new_tag) => {
                    playlist.entity_tag = new_tag;
                    playlist.push_added(track.clone());
                }
                Err(err) => {
                    tracing::warn!(target_id = %track.target_id, error = %err, "single add failed");
                    failures.push(track.target_id.clone());
                }
            }

            if (count + 1) % SINGLE_ADD_SLEEP_EVERY == 0 {
                sleep(SINGLE_ADD_SLEEP).await;
            }
        }

        if !failures.is_empty() {
            anyhow::bail!(
                "failed to add {} track(s): {}",
                failures.len(),
                failures.join(", ")
            );
        }
        Ok(failures)
    }

    /// Adds a single track, returning true on success. Used by the pipeline
    /// for the per-track add call inside the migration loop (as opposed to
    /// `add_items`'s batch path used for multi-track scenarios).
    pub async fn add_single(
        &self,
        playlist: &mut TargetPlaylist,
        track: &TargetTrack,
    ) -> std::result::Result<(), MigrationError> {
        match self.client.add_items(&playlist.uuid, &playlist.entity_tag, std::slice::from_ref(&track.target_id)).await {
            Ok(()) => {
                if let Ok(refreshed) = self.client.get_playlist(&playlist.uuid).await {
                    playlist.entity_tag = refreshed.entity_tag;
                }
                playlist.push_added(track.clone());
                Ok(())
            }
            Err(MigrationError::EntityTagMismatch) => {
                let fresh_tag = self
                    .client
                    .get_playlist(&playlist.uuid)
                    .await
                    .map_err(|e| MigrationError::transient(e))?
                    .entity_tag;
                let new_tag = self
                    .client
                    .add_item_single(&playlist.uuid, &fresh_tag, &track.target_id)
                    .await?;
                playlist.entity_tag = new_tag;
                playlist.push_added(track.clone());
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Removes duplicate occurrences of a target id, keeping the first one.
    /// Indices are deleted in batches of up to 50, sorted descending within
    /// each batch so earlier indices remain valid as later ones are removed.
    pub async fn remove_duplicates(
        &self,
        playlist: &mut TargetPlaylist,
    ) -> std::result::Result<(), MigrationError> {
        let mut duplicates = playlist.duplicate_indices();
        duplicates.sort_unstable_by(|a, b| b.cmp(a));

        for batch in duplicates.chunks(DELETE_BATCH_SIZE) {
            self.client
                .delete_items(&playlist.uuid, &playlist.entity_tag, batch)
                .await?;
            let refreshed = self
                .client
                .get_playlist(&playlist.uuid)
                .await
                .map_err(|e| MigrationError::transient(e))?;
            playlist.entity_tag = refreshed.entity_tag;
        }

        if !duplicates.is_empty() {
            let removed: std::collections::HashSet<usize> = duplicates.into_iter().collect();
            let mut kept = Vec::new();
            for item in playlist.items.drain(..) {
                if !removed.contains(&item.index) {
                    kept.push(item.track);
                }
            }
            playlist.items = kept
                .into_iter()
                .enumerate()
                .map(|(index, track)| PlaylistItem { index, track })
                .collect();
        }

        Ok(())
    }

    /// Updates the playlist's description to reflect the last-sync
    /// timestamp. Failures here are logged and ignored by the caller.
    pub async fn update_description(
        &self,
        playlist: &mut TargetPlaylist,
        description: &str,
    ) -> std::result::Result<(), MigrationError> {
        self.client
            .update_playlist(&playlist.uuid, &playlist.entity_tag, &playlist.title, description)
            .await?;
        playlist.description = description.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PlaylistSnapshot, PlaylistSummary};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct FakeTargetCatalog {
        playlists: StdMutex<Vec<PlaylistSummary>>,
        items: StdMutex<Vec<TargetTrack>>,
        tag_counter: StdMutex<u64>,
    }

    #[async_trait]
    impl TargetCatalogClient for FakeTargetCatalog {
        async fn list_playlists(&self, offset: u64, limit: u64) -> Result<Vec<PlaylistSummary>> {
            let playlists = self.playlists.lock().unwrap();
            let start = offset as usize;
            if start >= playlists.len() {
                return Ok(Vec::new());
            }
            let end = (start + limit as usize).min(playlists.len());
            Ok(playlists[start..end].to_vec())
        }

        async fn create_playlist(&self, title: &str, _description: &str) -> Result<String> {
            let mut playlists = self.playlists.lock().unwrap();
            let uuid = format!("uuid-{}", playlists.len());
            playlists.push(PlaylistSummary {
                uuid: uuid.clone(),
                title: title.to_string(),
            });
            Ok(uuid)
        }

        async fn get_playlist(&self, _uuid: &str) -> Result<PlaylistSnapshot> {
            let mut counter = self.tag_counter.lock().unwrap();
            *counter += 1;
            Ok(PlaylistSnapshot {
                entity_tag: format!("tag-{counter}"),
                total_items: self.items.lock().unwrap().len() as u64,
            })
        }

        async fn get_playlist_items(
            &self,
            _uuid: &str,
            offset: u64,
            limit: u64,
        ) -> Result<(u64, Vec<TargetTrack>)> {
            let items = self.items.lock().unwrap();
            let start = offset as usize;
            let total = items.len() as u64;
            if start >= items.len() {
                return Ok((total, Vec::new()));
            }
            let end = (start + limit as usize).min(items.len());
            Ok((total, items[start..end].to_vec()))
        }

        async fn add_items(
            &self,
            _uuid: &str,
            _entity_tag: &str,
            target_ids: &[String],
        ) -> std::result::Result<(), MigrationError> {
            let mut items = self.items.lock().unwrap();
            for id in target_ids {
                items.push(TargetTrack {
                    target_id: id.clone(),
                    title: "t".into(),
                    artists: vec!["a".into()],
                    album: "alb".into(),
                    duration_seconds: 200.0,
                    isrc: None,
                });
            }
            Ok(())
        }

        async fn add_item_single(
            &self,
            _uuid: &str,
            _entity_tag: &str,
            target_id: &str,
        ) -> std::result::Result<String, MigrationError> {
            self.items.lock().unwrap().push(TargetTrack {
                target_id: target_id.to_string(),
                title: "t".into(),
                artists: vec!["a".into()],
                album: "alb".into(),
                duration_seconds: 200.0,
                isrc: None,
            });
            Ok("tag-next".to_string())
        }

        async fn delete_items(
            &self,
            _uuid: &str,
            _entity_tag: &str,
            indices_descending: &[usize],
        ) -> std::result::Result<(), MigrationError> {
            let mut items = self.items.lock().unwrap();
            for &idx in indices_descending {
                if idx < items.len() {
                    items.remove(idx);
                }
            }
            Ok(())
        }

        async fn update_playlist(
            &self,
            _uuid: &str,
            _entity_tag: &str,
            _title: &str,
            _description: &str,
        ) -> std::result::Result<(), MigrationError> {
            Ok(())
        }

        async fn search_tracks(&self, _query: &str) -> Result<Vec<TargetTrack>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn find_or_create_creates_when_no_title_matches() {
        let catalog = Arc::new(FakeTargetCatalog {
            playlists: StdMutex::new(Vec::new()),
            items: StdMutex::new(Vec::new()),
            tag_counter: StdMutex::new(0),
        });
        let mutator = TargetPlaylistMutator::new(catalog);
        let playlist = mutator.find_or_create("Road Trip", "desc").await.unwrap();
        assert_eq!(playlist.title, "Road Trip");
        assert_eq!(playlist.total_items(), 0);
    }

    #[tokio::test]
    async fn duplicate_removal_collapses_repeated_ids() {
        let catalog = Arc::new(FakeTargetCatalog {
            playlists: StdMutex::new(vec![PlaylistSummary {
                uuid: "uuid-0".into(),
                title: "Road Trip".into(),
            }]),
            items: StdMutex::new(
                ["100", "200", "100", "300", "200"]
                    .into_iter()
                    .map(|id| TargetTrack {
                        target_id: id.to_string(),
                        title: "t".into(),
                        artists: vec!["a".into()],
                        album: "alb".into(),
                        duration_seconds: 200.0,
                        isrc: None,
                    })
                    .collect(),
            ),
            tag_counter: StdMutex::new(0),
        });
        let mutator = TargetPlaylistMutator::new(catalog);
        let mut playlist = mutator.find_or_create("Road Trip", "desc").await.unwrap();
        assert_eq!(playlist.duplicate_indices(), vec![2, 4]);
        mutator.remove_duplicates(&mut playlist).await.unwrap();
        let ids: Vec<&str> = playlist.items.iter().map(|i| i.track.target_id.as_str()).collect();
        assert_eq!(ids, vec!["100", "200", "300"]);
    }
}
