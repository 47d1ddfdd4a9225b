//! Error taxonomy for the migration core.
//!
//! Every external-call boundary (HTTP to the source/target catalogs, the
//! universal-link service, downloader and probe subprocesses) classifies its
//! failure into one of these variants rather than letting the underlying
//! error type leak into the pipeline. The classification drives recovery
//! behavior: transient errors downgrade a cascade step and let the cascade
//! continue, scoped errors are recorded against the owning playlist or track
//! and the run proceeds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// No usable source/target credential at subcommand entry. Fatal.
    #[error("not logged in: {0}")]
    AuthMissing(String),

    /// A recoverable HTTP/subprocess failure. The caller downgrades the
    /// current cascade step to a miss and proceeds; never fails a playlist
    /// by itself.
    #[error("transient failure: {source}")]
    Transient {
        #[source]
        source: anyhow::Error,
    },

    /// A playlist-scoped failure: source fetch, or find-or-create. No work
    /// is possible on this playlist; the run continues with the next one.
    #[error("playlist '{playlist}' failed: {reason}")]
    PlaylistScoped { playlist: String, reason: String },

    /// A single track could not be added after the full cascade including
    /// post-add rescue. Recorded as `failed_to_add`; never aborts the
    /// playlist.
    #[error("track failed: {reason}")]
    TrackScoped { reason: String },

    /// The target service's entity tag no longer matches — expected under
    /// optimistic concurrency. Callers catch this and fall back to the
    /// per-item add/delete path.
    #[error("entity tag mismatch")]
    EntityTagMismatch,

    /// The downloader subprocess did not complete successfully. Does not
    /// affect migration outcome; recorded as a download-status failure.
    #[error("downloader failed: {reason}")]
    DownloaderFailed { reason: String },
}

impl MigrationError {
    pub fn transient(source: impl Into<anyhow::Error>) -> Self {
        Self::Transient {
            source: source.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_entity_tag_mismatch(&self) -> bool {
        matches!(self, Self::EntityTagMismatch)
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_wraps_any_error() {
        let err = MigrationError::transient(anyhow::anyhow!("boom"));
        assert!(err.is_transient());
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn entity_tag_mismatch_is_detected() {
        assert!(MigrationError::EntityTagMismatch.is_entity_tag_mismatch());
        assert!(!MigrationError::AuthMissing("x".into()).is_entity_tag_mismatch());
    }
}
