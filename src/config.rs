//! Runtime configuration for the migration core.
//!
//! Environment-sourced and immutable for the lifetime of a run, following
//! the same `from_env` shape the catalog workers use for their own settings.
//! CLI argument parsing and credential acquisition remain the caller's
//! responsibility; this module only turns environment variables into a
//! validated `MigrationConfig`.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingRequired(String),

    #[error("invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Bounded pool size for playlist migration workers.
    pub migration_workers: usize,
    /// Bounded pool size for download workers.
    pub download_workers: usize,
    /// Universal-link service rate limit: max requests per window.
    pub universal_link_rate_limit: u32,
    /// Universal-link sliding window length.
    pub universal_link_window: Duration,
    /// Per-HTTP-call timeout.
    pub http_timeout: Duration,
    /// Downloader subprocess binary name.
    pub downloader_tool: String,
    /// Audio probe subprocess binary name.
    pub probe_tool: String,
    /// Root directory downloaded audio files are expected under.
    pub download_root: String,
    /// Root directory this run's log/report directory is created under.
    pub log_root: String,
    /// Human-readable source catalog name, used in playlist descriptions.
    pub source_name: String,
    /// Human-readable target catalog name, used in playlist descriptions.
    pub target_name: String,
    /// Whether to run duplicate-item cleanup after migrating a playlist.
    pub duplicate_cleanup: bool,
}

impl MigrationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            migration_workers: env_parsed("MIGRATION_WORKERS", 4)?,
            download_workers: env_parsed("DOWNLOAD_WORKERS", 2)?,
            universal_link_rate_limit: env_parsed("UNIVERSAL_LINK_RATE_LIMIT", 10)?,
            universal_link_window: Duration::from_secs(env_parsed(
                "UNIVERSAL_LINK_WINDOW_SECS",
                60,
            )?),
            http_timeout: Duration::from_secs(env_parsed("HTTP_TIMEOUT_SECS", 10)?),
            downloader_tool: env_or_default("DOWNLOADER_TOOL", "tiddl"),
            probe_tool: env_or_default("PROBE_TOOL", "ffprobe"),
            download_root: env_or_default("DOWNLOAD_ROOT", "./downloads"),
            log_root: env_or_default("LOG_ROOT", std::env::temp_dir().to_string_lossy().as_ref()),
            source_name: env_or_default("SOURCE_CATALOG_NAME", "Spotify"),
            target_name: env_or_default("TARGET_CATALOG_NAME", "Tidal"),
            duplicate_cleanup: env_parsed("DUPLICATE_CLEANUP", true)?,
        })
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse '{raw}'"),
        }),
    }
}
