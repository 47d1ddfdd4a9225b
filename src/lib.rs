//! Playlist catalog migration core.
//!
//! Migrates a user's playlists from a source streaming catalog into a target
//! streaming catalog, drives an external downloader subprocess against the
//! migrated playlists, and emits a per-playlist audit CSV enriched with
//! probed audio metadata.

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod matching;
pub mod models;
pub mod mutator;
pub mod pipeline;
pub mod rate_limit;
pub mod report;
pub mod ui;

pub use config::MigrationConfig;
pub use error::{MigrationError, Result};
