//! Report Collector: accumulates per-track outcome records, marks download
//! status once the Download Orchestrator reports in, locates and probes
//! downloaded files, and writes the per-playlist CSV and human-readable log.

pub mod audio_probe;
pub mod file_locator;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::models::{DownloadOutcome, TrackReport};

/// Sanitizes a playlist name for use as a filename: keeps alphanumerics,
/// space, `-`, `_`; collapses runs of whitespace to a single `-`; truncates
/// to 100 characters.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join("-");
    collapsed.chars().take(100).collect()
}

/// Row shape written to CSV, in the documented stable column order from
/// the external-interface contract.
#[derive(Serialize)]
struct CsvRow<'a> {
    source_id: &'a str,
    source_url: &'a str,
    source_title: &'a str,
    source_artist: &'a str,
    source_album: &'a str,
    source_duration_ms: u64,
    source_track_number: Option<u32>,
    source_isrc: Option<&'a str>,
    migration_status: String,
    resolution_source: String,
    target_id: Option<&'a str>,
    target_url: Option<&'a str>,
    target_title: Option<&'a str>,
    target_artist: Option<&'a str>,
    target_album: Option<&'a str>,
    target_duration_ms: Option<u64>,
    download_status: String,
    download_file_path: Option<&'a str>,
    file_size_bytes: Option<u64>,
    file_format: Option<&'a str>,
    codec_name: Option<&'a str>,
    codec_long_name: Option<&'a str>,
    sample_rate_hz: Option<u32>,
    channels: Option<u32>,
    channel_layout: Option<&'a str>,
    bit_depth: Option<u32>,
    bitrate_avg_bps: Option<u64>,
    bitrate_max_bps: Option<u64>,
    duration_seconds: Option<f64>,
}

impl<'a> From<&'a TrackReport> for CsvRow<'a> {
    fn from(r: &'a TrackReport) -> Self {
        CsvRow {
            source_id: &r.source_id,
            source_url: &r.source_url,
            source_title: &r.source_title,
            source_artist: &r.source_artist,
            source_album: &r.source_album,
            source_duration_ms: r.source_duration_ms,
            source_track_number: r.source_track_number,
            source_isrc: r.source_isrc.as_deref(),
            migration_status: r.migration_status.to_string(),
            resolution_source: r
                .resolution_source
                .map(|s| s.to_string())
                .unwrap_or_default(),
            target_id: r.target_id.as_deref(),
            target_url: r.target_url.as_deref(),
            target_title: r.target_title.as_deref(),
            target_artist: r.target_artist.as_deref(),
            target_album: r.target_album.as_deref(),
            target_duration_ms: r.target_duration_ms,
            download_status: r.download_status.to_string(),
            download_file_path: r.download_file_path.as_deref(),
            file_size_bytes: r.audio.file_size_bytes,
            file_format: r.audio.file_format.as_deref(),
            codec_name: r.audio.codec_name.as_deref(),
            codec_long_name: r.audio.codec_long_name.as_deref(),
            sample_rate_hz: r.audio.sample_rate_hz,
            channels: r.audio.channels,
            channel_layout: r.audio.channel_layout.as_deref(),
            bit_depth: r.audio.bit_depth,
            bitrate_avg_bps: r.audio.bitrate_avg_bps,
            bitrate_max_bps: r.audio.bitrate_max_bps,
            duration_seconds: r.audio.duration_seconds,
        }
    }
}

struct PlaylistReports {
    reports: Vec<TrackReport>,
}

pub struct ReportCollector {
    log_dir: PathBuf,
    download_root: PathBuf,
    probe_tool: String,
    playlists: Mutex<HashMap<String, PlaylistReports>>,
}

impl ReportCollector {
    pub fn new(log_dir: impl Into<PathBuf>, download_root: impl Into<PathBuf>, probe_tool: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            download_root: download_root.into(),
            probe_tool: probe_tool.into(),
            playlists: Mutex::new(HashMap::new()),
        }
    }

    pub async fn start_playlist(&self, playlist_name: &str) {
        let mut playlists = self.playlists.lock().await;
        playlists
            .entry(playlist_name.to_string())
            .or_insert_with(|| PlaylistReports { reports: Vec::new() });
    }

    /// Appends a track's report in arrival order (source-playlist order, by
    /// construction of the caller).
    pub async fn add_track(&self, playlist_name: &str, report: TrackReport) {
        let mut playlists = self.playlists.lock().await;
        playlists
            .entry(playlist_name.to_string())
            .or_insert_with(|| PlaylistReports { reports: Vec::new() })
            .reports
            .push(report);
    }

    /// Marks every `added`/`skipped` report in the playlist as `downloaded`
    /// if the playlist's download succeeded, otherwise `failed`.
    pub async fn mark_playlist_downloaded(&self, playlist_name: &str, success: bool) {
        let mut playlists = self.playlists.lock().await;
        let Some(entry) = playlists.get_mut(playlist_name) else {
            return;
        };
        for report in &mut entry.reports {
            let migrated = TrackReport::counts_as_migrated(&report.migration_status.to_string());
            report.download_status = if !migrated {
                DownloadOutcome::NotAttempted
            } else if success {
                DownloadOutcome::Downloaded
            } else {
                DownloadOutcome::Failed
            };
        }
    }

    /// For every downloaded report, locates the file under the download
    /// root and probes its audio attributes, then writes the playlist's CSV
    /// and human-readable text log.
    pub async fn finalize_and_write_reports(&self) -> Result<()> {
        std::fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("failed to create log directory {:?}", self.log_dir))?;

        let mut playlists = self.playlists.lock().await;
        for (name, entry) in playlists.iter_mut() {
            for report in &mut entry.reports {
                if report.download_status != DownloadOutcome::Downloaded {
                    continue;
                }
                let Some(title) = report.target_title.clone() else {
                    continue;
                };
                let artist = report.target_artist.clone().unwrap_or_default();
                if let Some(path) = file_locator::locate_file(&self.download_root, &title, &artist) {
                    match audio_probe::probe(&self.probe_tool, &path).await {
                        Ok(attrs) => report.audio = attrs,
                        Err(err) => tracing::warn!(file = ?path, error = %err, "audio probe failed"),
                    }
                    report.download_file_path = Some(path.to_string_lossy().into_owned());
                }
            }

            self.write_text_log(name, &entry.reports)?;
            self.write_csv(name, &entry.reports)?;
        }
        Ok(())
    }

    fn write_text_log(&self, playlist_name: &str, reports: &[TrackReport]) -> Result<()> {
        let sanitized = sanitize_filename(playlist_name);
        let path = self.log_dir.join(format!("pl-{sanitized}.txt"));
        let mut lines = Vec::with_capacity(reports.len());
        for report in reports {
            let resolution = report
                .resolution_source
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "{} — {} by {} [{}/{}, download: {}]",
                report.source_id,
                report.source_title,
                report.source_artist,
                report.migration_status,
                resolution,
                report.download_status,
            ));
        }
        std::fs::write(&path, lines.join("\n"))
            .with_context(|| format!("failed to write text log {path:?}"))
    }

    fn write_csv(&self, playlist_name: &str, reports: &[TrackReport]) -> Result<()> {
        let sanitized = sanitize_filename(playlist_name);
        let path = self.log_dir.join(format!("pl-{sanitized}.csv"));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create CSV {path:?}"))?;
        for report in reports {
            writer
                .serialize(CsvRow::from(report))
                .context("failed to serialize CSV row")?;
        }
        writer.flush().context("failed to flush CSV writer")
    }

    /// Paths of the CSV/txt files a finished run produced, for tests and
    /// callers that want to inspect the output directory directly.
    pub fn csv_path(&self, playlist_name: &str) -> PathBuf {
        self.log_dir.join(format!("pl-{}.csv", sanitize_filename(playlist_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MigrationOutcome, ResolutionSource, SourceTrack};

    fn sample_report() -> TrackReport {
        let source = SourceTrack {
            source_id: "S1".into(),
            title: "Levitating".into(),
            artists: vec!["Dua Lipa".into()],
            album: "Future Nostalgia".into(),
            duration_ms: 203_000,
            track_number: Some(1),
            isrc: Some("GBAHS2000623".into()),
        };
        let mut report = TrackReport::from_source(&source, "https://open.spotify.com/track");
        report.migration_status = MigrationOutcome::Added;
        report.resolution_source = Some(ResolutionSource::UniversalLink);
        report.target_id = Some("200".into());
        report
    }

    #[test]
    fn sanitize_filename_collapses_whitespace_and_truncates() {
        let sanitized = sanitize_filename("My   Road   Trip Mix!!!");
        assert_eq!(sanitized, "My-Road-Trip-Mix");
    }

    #[tokio::test]
    async fn mark_playlist_downloaded_respects_migration_status() {
        let collector = ReportCollector::new("/tmp/unused", "/tmp/unused", "ffprobe");
        collector.start_playlist("Road Trip").await;
        let mut report = sample_report();
        report.migration_status = MigrationOutcome::NotFound;
        collector.add_track("Road Trip", report).await;
        collector.add_track("Road Trip", sample_report()).await;

        collector.mark_playlist_downloaded("Road Trip", true).await;

        let playlists = collector.playlists.lock().await;
        let reports = &playlists.get("Road Trip").unwrap().reports;
        assert_eq!(reports[0].download_status, DownloadOutcome::NotAttempted);
        assert_eq!(reports[1].download_status, DownloadOutcome::Downloaded);
    }

    #[test]
    fn legacy_found_status_counts_as_migrated() {
        assert!(TrackReport::counts_as_migrated("found"));
        assert!(TrackReport::counts_as_migrated("added"));
        assert!(!TrackReport::counts_as_migrated("not_found"));
    }
}
