use serde::{Deserialize, Serialize};

use super::track::SourceTrack;

/// Outcome of resolving and adding a single source track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOutcome {
    Added,
    Skipped,
    NotFound,
    FailedToAdd,
}

impl std::fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Skipped => "skipped",
            Self::NotFound => "not_found",
            Self::FailedToAdd => "failed_to_add",
        };
        write!(f, "{s}")
    }
}

/// Which cascade step produced a match, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    MetadataMatch,
    UniversalLink,
    TargetSearch,
    TargetSearchFallback,
    Existing,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MetadataMatch => "metadata_match",
            Self::UniversalLink => "universal_link",
            Self::TargetSearch => "target_search",
            Self::TargetSearchFallback => "target_search_fallback",
            Self::Existing => "existing",
        };
        write!(f, "{s}")
    }
}

/// Outcome of the playlist-level download attempt, as it applies to this
/// track's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadOutcome {
    Downloaded,
    Failed,
    NotAttempted,
}

impl std::fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Downloaded => "downloaded",
            Self::Failed => "failed",
            Self::NotAttempted => "not_attempted",
        };
        write!(f, "{s}")
    }
}

/// Probed attributes of the located audio file, populated at report
/// finalization time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioAttributes {
    pub file_format: Option<String>,
    pub codec_name: Option<String>,
    pub codec_long_name: Option<String>,
    pub sample_rate_hz: Option<u32>,
    pub channels: Option<u32>,
    pub channel_layout: Option<String>,
    pub bit_depth: Option<u32>,
    pub bitrate_avg_bps: Option<u64>,
    pub bitrate_max_bps: Option<u64>,
    pub duration_seconds: Option<f64>,
    pub file_size_bytes: Option<u64>,
}

/// Per-source-track audit record. Created when a source track is first
/// processed, mutated exactly once at migration time and possibly once more
/// during report finalization to attach file-level attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackReport {
    pub source_id: String,
    pub source_url: String,
    pub source_title: String,
    pub source_artist: String,
    pub source_album: String,
    pub source_duration_ms: u64,
    pub source_track_number: Option<u32>,
    pub source_isrc: Option<String>,

    pub migration_status: MigrationOutcome,
    pub resolution_source: Option<ResolutionSource>,

    pub target_id: Option<String>,
    pub target_url: Option<String>,
    pub target_title: Option<String>,
    pub target_artist: Option<String>,
    pub target_album: Option<String>,
    pub target_duration_ms: Option<u64>,

    pub download_status: DownloadOutcome,
    pub download_file_path: Option<String>,

    #[serde(flatten)]
    pub audio: AudioAttributes,
}

impl TrackReport {
    pub fn from_source(source: &SourceTrack, source_url_base: &str) -> Self {
        Self {
            source_id: source.source_id.clone(),
            source_url: format!("{source_url_base}/{}", source.source_id),
            source_title: source.title.clone(),
            source_artist: source.artists_joined(),
            source_album: source.album.clone(),
            source_duration_ms: source.duration_ms,
            source_track_number: source.track_number,
            source_isrc: source.isrc.clone(),
            migration_status: MigrationOutcome::NotFound,
            resolution_source: None,
            target_id: None,
            target_url: None,
            target_title: None,
            target_artist: None,
            target_album: None,
            target_duration_ms: None,
            download_status: DownloadOutcome::NotAttempted,
            download_file_path: None,
            audio: AudioAttributes::default(),
        }
    }

    /// Accepts the legacy `"found"` status as an alias of `added`/`skipped`
    /// when deciding whether a track should be marked downloaded. The live
    /// code path here never produces `"found"` itself; this only guards
    /// against stale/imported report data carrying it.
    pub fn counts_as_migrated(status_label: &str) -> bool {
        matches!(status_label, "added" | "skipped" | "found")
    }
}
