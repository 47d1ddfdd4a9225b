//! Live split-screen terminal display: a Migration panel (left) and a
//! Download panel (right), both refreshed at 4 Hz from the two event
//! streams the Pipeline and Download Orchestrator emit.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::download::DownloadEvent;
use crate::models::{MigrationOutcome, ResolutionSource};
use crate::pipeline::{MigrationEvent, PlaylistEvent, TrackEvent};

const REFRESH_INTERVAL: Duration = Duration::from_millis(250);
const MIGRATION_LOG_CAPACITY: usize = 20;
const DOWNLOAD_LOG_CAPACITY: usize = 20;
const ETA_SAMPLE_WINDOW: usize = 100;

/// Strips characters that make terminal columns unstable: variation
/// selectors, zero-width joiners/spaces, and stray control characters.
fn strip_unstable_codepoints(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            let cp = *c as u32;
            let is_variation_selector = (0xFE00..=0xFE0F).contains(&cp);
            let is_zero_width = matches!(cp, 0x200B..=0x200D | 0xFEFF);
            let is_stray_control = c.is_control() && *c != '\t' && *c != '\n';
            !is_variation_selector && !is_zero_width && !is_stray_control
        })
        .collect()
}

/// Truncates to `width` characters, appending an ellipsis if truncated.
fn truncate_with_ellipsis(input: &str, width: usize) -> String {
    let cleaned = strip_unstable_codepoints(input);
    if cleaned.chars().count() <= width {
        return cleaned;
    }
    let mut truncated: String = cleaned.chars().take(width.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

#[derive(Default)]
struct MigrationWorkerState {
    playlist_number: usize,
    total_playlists: usize,
    playlist_name: String,
    current_track: String,
}

struct MigrationPanelState {
    workers: HashMap<usize, MigrationWorkerState>,
    done_playlists: usize,
    total_playlists: usize,
    added: usize,
    skipped: usize,
    failed: usize,
    recent_track_durations: VecDeque<Duration>,
    last_track_started_at: Option<Instant>,
    activity_log: VecDeque<String>,
}

impl MigrationPanelState {
    fn new() -> Self {
        Self {
            workers: HashMap::new(),
            done_playlists: 0,
            total_playlists: 0,
            added: 0,
            skipped: 0,
            failed: 0,
            recent_track_durations: VecDeque::with_capacity(ETA_SAMPLE_WINDOW),
            last_track_started_at: None,
            activity_log: VecDeque::with_capacity(MIGRATION_LOG_CAPACITY),
        }
    }

    /// Playlists currently checked out by a worker but not yet finished.
    /// No per-track "started" signal exists on the event stream, so this
    /// is the coarsest-grained true `pending` count available here.
    fn pending_playlists(&self) -> usize {
        self.workers.len()
    }

    fn push_log(&mut self, line: String) {
        if self.activity_log.len() == MIGRATION_LOG_CAPACITY {
            self.activity_log.pop_front();
        }
        self.activity_log.push_back(line);
    }

    fn record_track_duration(&mut self) {
        let now = Instant::now();
        if let Some(started) = self.last_track_started_at {
            if self.recent_track_durations.len() == ETA_SAMPLE_WINDOW {
                self.recent_track_durations.pop_front();
            }
            self.recent_track_durations.push_back(now.duration_since(started));
        }
        self.last_track_started_at = Some(now);
    }

    fn mean_track_duration(&self) -> Option<Duration> {
        if self.recent_track_durations.is_empty() {
            return None;
        }
        let total: Duration = self.recent_track_durations.iter().sum();
        Some(total / self.recent_track_durations.len() as u32)
    }

    fn eta(&self) -> Option<Duration> {
        let mean = self.mean_track_duration()?;
        let active_workers = self.workers.len().max(1) as u32;
        Some(mean / active_workers)
    }

    fn apply(&mut self, event: PlaylistEvent) {
        match event {
            PlaylistEvent::Started { worker_id, playlist_number, total_playlists, name } => {
                self.total_playlists = total_playlists;
                self.workers.insert(
                    worker_id,
                    MigrationWorkerState {
                        playlist_number,
                        total_playlists,
                        playlist_name: name.clone(),
                        current_track: String::new(),
                    },
                );
                self.push_log(format!("worker {worker_id} started '{name}'"));
            }
            PlaylistEvent::TrackProgress { worker_id, event, .. } => {
                self.record_track_duration();
                let TrackEvent::Resolved { title, outcome, resolution, .. } = event;
                if let Some(worker) = self.workers.get_mut(&worker_id) {
                    worker.current_track = title.clone();
                }
                match outcome {
                    MigrationOutcome::Added => self.added += 1,
                    MigrationOutcome::Skipped => self.skipped += 1,
                    MigrationOutcome::NotFound | MigrationOutcome::FailedToAdd => self.failed += 1,
                }
                let via = resolution
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".to_string());
                self.push_log(format!("{title} -> {outcome} ({via})"));
            }
            PlaylistEvent::Finished { worker_id, name, track_count, .. } => {
                self.workers.remove(&worker_id);
                self.done_playlists += 1;
                self.push_log(format!("'{name}' finished ({track_count} tracks)"));
            }
            PlaylistEvent::Failed { worker_id, name, reason } => {
                self.workers.remove(&worker_id);
                self.done_playlists += 1;
                self.push_log(format!("'{name}' failed: {reason}"));
            }
        }
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(format!(
            "Playlists: [{}/{}] ({} workers)",
            self.done_playlists,
            self.total_playlists,
            self.workers.len()
        ));
        let mut worker_ids: Vec<_> = self.workers.keys().copied().collect();
        worker_ids.sort_unstable();
        for worker_id in worker_ids {
            let worker = &self.workers[&worker_id];
            lines.push(format!(
                "  [worker {worker_id}] {}/{} {}",
                worker.playlist_number,
                worker.total_playlists,
                truncate_with_ellipsis(&worker.playlist_name, 40)
            ));
            lines.push(format!("    {}", truncate_with_ellipsis(&worker.current_track, 60)));
        }
        let eta = self
            .eta()
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "pending={} added={} skipped={} failed={} eta={}",
            self.pending_playlists(), self.added, self.skipped, self.failed, eta
        ));
        for entry in &self.activity_log {
            lines.push(format!("  {}", truncate_with_ellipsis(entry, 80)));
        }
        lines
    }
}

struct DownloadPanelState {
    current: HashMap<usize, (String, String)>,
    completed: usize,
    failed: usize,
    pending: usize,
    activity_log: VecDeque<String>,
}

impl DownloadPanelState {
    fn new() -> Self {
        Self {
            current: HashMap::new(),
            completed: 0,
            failed: 0,
            pending: 0,
            activity_log: VecDeque::with_capacity(DOWNLOAD_LOG_CAPACITY),
        }
    }

    fn push_log(&mut self, line: String) {
        if self.activity_log.len() == DOWNLOAD_LOG_CAPACITY {
            self.activity_log.pop_front();
        }
        self.activity_log.push_back(line);
    }

    fn apply(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started { worker_id, name, uuid, .. } => {
                self.pending += 1;
                self.current.insert(worker_id, (name.clone(), uuid));
                self.push_log(format!("worker {worker_id} downloading '{name}'"));
            }
            DownloadEvent::Completed { worker_id, result } => {
                self.current.remove(&worker_id);
                self.pending = self.pending.saturating_sub(1);
                if result.success {
                    self.completed += 1;
                    self.push_log(format!("'{}' downloaded", result.name));
                } else {
                    self.failed += 1;
                    self.push_log(format!("'{}' failed: {}", result.name, result.message));
                }
            }
        }
    }

    fn render(&self) -> Vec<String> {
        let mut lines = vec![format!("Queue: {} pending", self.pending)];
        let mut worker_ids: Vec<_> = self.current.keys().copied().collect();
        worker_ids.sort_unstable();
        for worker_id in worker_ids {
            let (name, _) = &self.current[&worker_id];
            lines.push(format!("  [worker {worker_id}] {}", truncate_with_ellipsis(name, 40)));
        }
        lines.push(format!(
            "completed={} failed={} pending={}",
            self.completed, self.failed, self.pending
        ));
        for entry in &self.activity_log {
            lines.push(format!("  {}", truncate_with_ellipsis(entry, 80)));
        }
        lines
    }
}

/// Drives both panels from their event channels until both senders are
/// dropped, redrawing at [`REFRESH_INTERVAL`]. Each panel is rendered as a
/// dedicated `indicatif` bar whose message is the panel's full text block —
/// this crate has no split-screen TUI dependency, so two tall progress bars
/// stacked in a `MultiProgress` stand in for the two panels.
pub async fn run_live_ui(
    mut migration_events: mpsc::UnboundedReceiver<MigrationEvent>,
    mut download_events: mpsc::UnboundedReceiver<DownloadEvent>,
) {
    let multi = MultiProgress::new();
    let style = ProgressStyle::with_template("{msg}").expect("static template is valid");

    let migration_bar = multi.add(ProgressBar::new_spinner());
    migration_bar.set_style(style.clone());
    let download_bar = multi.add(ProgressBar::new_spinner());
    download_bar.set_style(style);

    let mut migration_state = MigrationPanelState::new();
    let mut download_state = DownloadPanelState::new();
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);

    loop {
        tokio::select! {
            maybe_event = migration_events.recv() => {
                match maybe_event {
                    Some(MigrationEvent::Playlist(event)) => migration_state.apply(event),
                    None => break,
                }
            }
            maybe_event = download_events.recv() => {
                if let Some(event) = maybe_event {
                    download_state.apply(event);
                }
            }
            _ = ticker.tick() => {
                migration_bar.set_message(migration_state.render().join("\n"));
                download_bar.set_message(download_state.render().join("\n"));
            }
        }
    }

    migration_bar.set_message(migration_state.render().join("\n"));
    download_bar.set_message(download_state.render().join("\n"));
    migration_bar.finish();
    download_bar.finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_with_ellipsis_leaves_short_strings_untouched() {
        assert_eq!(truncate_with_ellipsis("Levitating", 40), "Levitating");
    }

    #[test]
    fn truncate_with_ellipsis_truncates_and_marks_long_strings() {
        let truncated = truncate_with_ellipsis("a very long playlist name indeed", 10);
        assert_eq!(truncated.chars().count(), 10);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn strip_unstable_codepoints_removes_zero_width_joiner() {
        let input = "Do\u{200D}min\u{FE0F}o";
        assert_eq!(strip_unstable_codepoints(input), "Domino");
    }

    #[test]
    fn migration_panel_activity_log_is_bounded() {
        let mut state = MigrationPanelState::new();
        for i in 0..30 {
            state.push_log(format!("entry {i}"));
        }
        assert_eq!(state.activity_log.len(), MIGRATION_LOG_CAPACITY);
        assert_eq!(state.activity_log.front().unwrap(), "entry 10");
    }

    #[test]
    fn migration_panel_counts_outcomes() {
        let mut state = MigrationPanelState::new();
        state.apply(PlaylistEvent::Started {
            worker_id: 0,
            playlist_number: 1,
            total_playlists: 1,
            name: "Road Trip".to_string(),
        });
        state.apply(PlaylistEvent::TrackProgress {
            worker_id: 0,
            name: "Road Trip".to_string(),
            event: TrackEvent::Resolved {
                source_id: "S1".to_string(),
                title: "Levitating".to_string(),
                outcome: MigrationOutcome::Added,
                resolution: Some(ResolutionSource::MetadataMatch),
            },
        });
        assert_eq!(state.added, 1);
        assert_eq!(state.skipped, 0);
    }
}
