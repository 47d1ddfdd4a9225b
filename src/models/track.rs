use serde::{Deserialize, Serialize};

/// Immutable descriptor of a track in the source catalog. Constructed by the
/// source-catalog fetcher; never mutated within the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTrack {
    pub source_id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_ms: u64,
    pub track_number: Option<u32>,
    pub isrc: Option<String>,
}

impl SourceTrack {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    pub fn artists_joined(&self) -> String {
        self.artists.join(", ")
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Immutable descriptor of a track in the target catalog. Constructed by the
/// catalog client; never mutated within the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetTrack {
    pub target_id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_seconds: f64,
    pub isrc: Option<String>,
}

impl TargetTrack {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    pub fn artists_joined(&self) -> String {
        self.artists.join(", ")
    }
}
