//! Migration Pipeline: a bounded worker pool that migrates playlists. Per
//! playlist: fetch source tracks, find-or-create the target playlist,
//! resolve each track through the matching cascade, run duplicate cleanup,
//! then hand off to the Download Orchestrator. Emits progress events over a
//! channel consumed by the live UI and report collector.

pub mod events;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Semaphore};

use crate::catalog::{SourceCatalogClient, TargetCatalogClient, UniversalLinkClient};
use crate::config::MigrationConfig;
use crate::download::DownloadOrchestrator;
use crate::matching::engine::{self, CascadeOutcome};
use crate::models::{MigrationOutcome, ResolutionSource, SourceTrack, TargetPlaylist, TrackReport};
use crate::mutator::TargetPlaylistMutator;

pub use events::{MigrationEvent, PlaylistEvent, TrackEvent};

/// A source playlist the caller has selected for migration.
#[derive(Debug, Clone)]
pub struct SourcePlaylistRef {
    pub id: String,
    pub name: String,
}

/// Per-playlist outcome handed back to the caller: the populated track
/// reports plus the target uuid the Download Orchestrator was given, if the
/// playlist produced one.
#[derive(Debug, Clone)]
pub struct PlaylistMigrationResult {
    pub playlist_name: String,
    pub target_uuid: Option<String>,
    pub reports: Vec<TrackReport>,
}

fn source_track_url(source_name: &str, source_id: &str) -> String {
    match source_name.to_lowercase().as_str() {
        "spotify" => format!("https://open.spotify.com/track/{source_id}"),
        other => format!("https://{other}.example/track/{source_id}"),
    }
}

pub struct MigrationPipeline {
    config: MigrationConfig,
    source_client: Arc<dyn SourceCatalogClient>,
    target_client: Arc<dyn TargetCatalogClient>,
    universal_link: Arc<dyn UniversalLinkClient>,
    mutator: Arc<TargetPlaylistMutator>,
    downloader: Arc<DownloadOrchestrator>,
    events: mpsc::UnboundedSender<MigrationEvent>,
    playlist_counter: Arc<Mutex<usize>>,
    next_worker_id: Arc<AtomicUsize>,
}

impl MigrationPipeline {
    pub fn new(
        config: MigrationConfig,
        source_client: Arc<dyn SourceCatalogClient>,
        target_client: Arc<dyn TargetCatalogClient>,
        universal_link: Arc<dyn UniversalLinkClient>,
        downloader: Arc<DownloadOrchestrator>,
        events: mpsc::UnboundedSender<MigrationEvent>,
    ) -> Self {
        let mutator = Arc::new(TargetPlaylistMutator::new(target_client.clone()));
        Self {
            config,
            source_client,
            target_client,
            universal_link,
            mutator,
            downloader,
            events,
            playlist_counter: Arc::new(Mutex::new(0)),
            next_worker_id: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fans out across `migration_workers` bounded tasks, one per playlist.
    /// A single bad playlist is caught at this boundary and recorded as
    /// `PlaylistEvent::Failed`; it never drains the pool.
    pub async fn run(&self, playlists: Vec<SourcePlaylistRef>) -> Vec<PlaylistMigrationResult> {
        let total = playlists.len();
        let semaphore = Arc::new(Semaphore::new(self.config.migration_workers.max(1)));
        let mut handles = Vec::new();

        for playlist in playlists {
            let semaphore = semaphore.clone();
            let worker_id = self.next_worker_id.fetch_add(1, Ordering::SeqCst)
                % self.config.migration_workers.max(1);
            let this = self.clone_handles();
            let events = self.events.clone();
            let counter = self.playlist_counter.clone();

            let handle = tokio::task::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let playlist_number = {
                    let mut count = counter.lock().await;
                    *count += 1;
                    *count
                };

                let _ = events.send(MigrationEvent::Playlist(PlaylistEvent::Started {
                    worker_id,
                    playlist_number,
                    total_playlists: total,
                    name: playlist.name.clone(),
                }));

                match this.migrate_playlist(worker_id, &playlist).await {
                    Ok(result) => {
                        let _ = events.send(MigrationEvent::Playlist(PlaylistEvent::Finished {
                            worker_id,
                            name: playlist.name.clone(),
                            target_uuid: result.target_uuid.clone(),
                            track_count: result.reports.len(),
                        }));
                        result
                    }
                    Err(err) => {
                        tracing::warn!(playlist = %playlist.name, error = %err, "playlist migration failed");
                        let _ = events.send(MigrationEvent::Playlist(PlaylistEvent::Failed {
                            worker_id,
                            name: playlist.name.clone(),
                            reason: err.to_string(),
                        }));
                        PlaylistMigrationResult {
                            playlist_name: playlist.name,
                            target_uuid: None,
                            reports: Vec::new(),
                        }
                    }
                }
            });
            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_err) => tracing::error!(error = %join_err, "migration worker task panicked"),
            }
        }
        results
    }

    /// Shallow clone of everything a spawned worker task needs, avoiding a
    /// `Clone` bound on the whole pipeline (the event sender and the
    /// playlist counter are shared through `Arc`/`mpsc` clones already).
    fn clone_handles(&self) -> MigrationPipeline {
        MigrationPipeline {
            config: self.config.clone(),
            source_client: self.source_client.clone(),
            target_client: self.target_client.clone(),
            universal_link: self.universal_link.clone(),
            mutator: self.mutator.clone(),
            downloader: self.downloader.clone(),
            events: self.events.clone(),
            playlist_counter: self.playlist_counter.clone(),
            next_worker_id: self.next_worker_id.clone(),
        }
    }

    async fn migrate_playlist(
        &self,
        worker_id: usize,
        playlist: &SourcePlaylistRef,
    ) -> anyhow::Result<PlaylistMigrationResult> {
        let source_tracks = self
            .source_client
            .fetch_playlist_tracks(&playlist.id)
            .await
            .map_err(|e| anyhow::anyhow!("fetch failed for '{}': {e}", playlist.name))?;

        let description = format!(
            "Migrated from {} via {} | Last sync: {}",
            self.config.source_name,
            self.config.downloader_tool,
            chrono::Utc::now().to_rfc3339()
        );

        let mut target_playlist = self
            .mutator
            .find_or_create(&playlist.name, &description)
            .await
            .map_err(|e| anyhow::anyhow!("find-or-create failed for '{}': {e}", playlist.name))?;

        let mut reports = Vec::with_capacity(source_tracks.len());
        for source in &source_tracks {
            let report = self
                .resolve_and_add_one(worker_id, playlist, source, &mut target_playlist)
                .await;
            reports.push(report);
        }

        if let Err(err) = self
            .mutator
            .update_description(&mut target_playlist, &description)
            .await
        {
            tracing::warn!(playlist = %playlist.name, error = %err, "description update failed, ignoring");
        }

        if self.config.duplicate_cleanup {
            if let Err(err) = self.mutator.remove_duplicates(&mut target_playlist).await {
                tracing::warn!(playlist = %playlist.name, error = %err, "duplicate cleanup failed");
            }
        }

        self.downloader.add(
            target_playlist.uuid.clone(),
            playlist.name.clone(),
            Some(source_tracks.len()),
        );

        Ok(PlaylistMigrationResult {
            playlist_name: playlist.name.clone(),
            target_uuid: Some(target_playlist.uuid.clone()),
            reports,
        })
    }

    async fn resolve_and_add_one(
        &self,
        worker_id: usize,
        playlist: &SourcePlaylistRef,
        source: &SourceTrack,
        target_playlist: &mut TargetPlaylist,
    ) -> TrackReport {
        let track_url = source_track_url(&self.config.source_name, &source.source_id);
        let mut report = TrackReport::from_source(source, "");
        report.source_url = track_url.clone();

        // Steps 1-3: metadata match against the live snapshot, then
        // universal-link, then target-catalog search.
        let target_platform = self.config.target_name.to_lowercase();
        let hit = engine::resolve(
            source,
            &target_playlist.items,
            &track_url,
            &target_platform,
            self.universal_link.as_ref(),
            self.target_client.clone(),
        )
        .await;

        let (mut candidate, mut tag) = match hit {
            CascadeOutcome::Hit { track, source: tag } => (track, tag),
            CascadeOutcome::Miss => {
                report.migration_status = MigrationOutcome::NotFound;
                self.emit_track_event(worker_id, playlist, &report);
                return report;
            }
        };

        if tag == ResolutionSource::MetadataMatch {
            report.migration_status = MigrationOutcome::Skipped;
            report.resolution_source = Some(tag);
            fill_target_fields(&mut report, &candidate);
            self.emit_track_event(worker_id, playlist, &report);
            return report;
        }

        if target_playlist.contains_target_id(&candidate.target_id) {
            report.migration_status = MigrationOutcome::Skipped;
            report.resolution_source = Some(ResolutionSource::Existing);
            fill_target_fields(&mut report, &candidate);
            self.emit_track_event(worker_id, playlist, &report);
            return report;
        }

        match self.mutator.add_single(target_playlist, &candidate).await {
            Ok(()) => {
                report.migration_status = MigrationOutcome::Added;
                report.resolution_source = Some(tag);
                fill_target_fields(&mut report, &candidate);
            }
            Err(first_err) => {
                tracing::debug!(track = %source.title, error = %first_err, "add failed, attempting post-add rescue");
                match engine::match_via_search(
                    source,
                    self.target_client.as_ref(),
                    ResolutionSource::TargetSearchFallback,
                )
                .await
                {
                    CascadeOutcome::Hit { track: rescued, source: rescued_tag }
                        if rescued.target_id != candidate.target_id =>
                    {
                        candidate = rescued;
                        tag = rescued_tag;
                        match self.mutator.add_single(target_playlist, &candidate).await {
                            Ok(()) => {
                                report.migration_status = MigrationOutcome::Added;
                                report.resolution_source = Some(tag);
                                fill_target_fields(&mut report, &candidate);
                            }
                            Err(_) => {
                                report.migration_status = MigrationOutcome::FailedToAdd;
                            }
                        }
                    }
                    _ => {
                        report.migration_status = MigrationOutcome::FailedToAdd;
                    }
                }
            }
        }

        self.emit_track_event(worker_id, playlist, &report);
        report
    }

    fn emit_track_event(&self, worker_id: usize, playlist: &SourcePlaylistRef, report: &TrackReport) {
        let _ = self
            .events
            .send(MigrationEvent::Playlist(PlaylistEvent::TrackProgress {
                worker_id,
                name: playlist.name.clone(),
                event: TrackEvent::Resolved {
                    source_id: report.source_id.clone(),
                    title: report.source_title.clone(),
                    outcome: report.migration_status,
                    resolution: report.resolution_source,
                },
            }));
    }
}

fn fill_target_fields(report: &mut TrackReport, track: &crate::models::TargetTrack) {
    report.target_id = Some(track.target_id.clone());
    report.target_url = Some(track.target_id.clone());
    report.target_title = Some(track.title.clone());
    report.target_artist = Some(track.artists_joined());
    report.target_album = Some(track.album.clone());
    report.target_duration_ms = Some((track.duration_seconds * 1000.0) as u64);
}
