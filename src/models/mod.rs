//! Core data model: the immutable track descriptors, the mutable target
//! playlist, a single run's identity, and the per-track audit record.

mod playlist;
mod report;
mod run;
mod track;

pub use playlist::{PlaylistItem, TargetPlaylist};
pub use report::{AudioAttributes, DownloadOutcome, MigrationOutcome, ResolutionSource, TrackReport};
pub use run::MigrationRun;
pub use track::{SourceTrack, TargetTrack};
