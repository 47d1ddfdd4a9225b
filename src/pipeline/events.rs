//! Progress events emitted by migration workers, consumed by the live UI
//! and the report collector over an `mpsc` channel. Carries an explicit
//! `worker_id` allocated at task-submission time rather than keying state by
//! OS thread identity.

use crate::models::{MigrationOutcome, ResolutionSource};

#[derive(Debug, Clone)]
pub enum TrackEvent {
    Resolved {
        source_id: String,
        title: String,
        outcome: MigrationOutcome,
        resolution: Option<ResolutionSource>,
    },
}

#[derive(Debug, Clone)]
pub enum PlaylistEvent {
    Started {
        worker_id: usize,
        playlist_number: usize,
        total_playlists: usize,
        name: String,
    },
    TrackProgress {
        worker_id: usize,
        name: String,
        event: TrackEvent,
    },
    Finished {
        worker_id: usize,
        name: String,
        target_uuid: Option<String>,
        track_count: usize,
    },
    Failed {
        worker_id: usize,
        name: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub enum MigrationEvent {
    Playlist(PlaylistEvent),
}
