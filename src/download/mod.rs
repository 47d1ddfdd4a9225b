//! Download Orchestrator: a bounded worker pool that shells out to the
//! external downloader binary per playlist, with a dynamic timeout and
//! start/complete callbacks for the live UI and report collector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};

/// Lower bound on a playlist's download timeout.
const MIN_TIMEOUT: Duration = Duration::from_secs(600);
/// Per-track allowance added on top of the minimum.
const PER_TRACK_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout used when the track count is unknown.
const UNKNOWN_TRACK_COUNT_TIMEOUT: Duration = Duration::from_secs(7200);

/// `max(600s, track_count * 30s)`; `7200s` if the track count is unknown.
/// Per-playlist, not per-track.
pub fn dynamic_timeout(track_count: Option<usize>) -> Duration {
    match track_count {
        None => UNKNOWN_TRACK_COUNT_TIMEOUT,
        Some(count) => std::cmp::max(MIN_TIMEOUT, PER_TRACK_TIMEOUT * count as u32),
    }
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub uuid: String,
    pub name: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Started {
        worker_id: usize,
        uuid: String,
        name: String,
        track_count: Option<usize>,
    },
    Completed {
        worker_id: usize,
        result: DownloadResult,
    },
}

struct Counters {
    completed: AtomicUsize,
    failed: AtomicUsize,
    pending: AtomicUsize,
}

/// Bounded-parallel pool of download workers. `add` either dispatches
/// immediately (parallel mode, the default) or the caller can batch calls
/// and drain them with `wait_for_completion`.
pub struct DownloadOrchestrator {
    tool: String,
    worker_count: usize,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    events: mpsc::UnboundedSender<DownloadEvent>,
    next_worker_id: Arc<AtomicUsize>,
    tasks: std::sync::Mutex<Vec<tokio::task::JoinHandle<DownloadResult>>>,
}

impl DownloadOrchestrator {
    pub fn new(tool: impl Into<String>, worker_count: usize) -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker_count = worker_count.max(1);
        (
            Self {
                tool: tool.into(),
                worker_count,
                semaphore: Arc::new(Semaphore::new(worker_count)),
                counters: Arc::new(Counters {
                    completed: AtomicUsize::new(0),
                    failed: AtomicUsize::new(0),
                    pending: AtomicUsize::new(0),
                }),
                events: tx,
                next_worker_id: Arc::new(AtomicUsize::new(0)),
                tasks: std::sync::Mutex::new(Vec::new()),
            },
            rx,
        )
    }

    pub fn completed(&self) -> usize {
        self.counters.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.counters.failed.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    /// Dispatches a playlist download immediately onto the worker pool.
    pub fn add(&self, uuid: String, name: String, track_count: Option<usize>) {
        self.counters.pending.fetch_add(1, Ordering::SeqCst);

        let tool = self.tool.clone();
        let semaphore = self.semaphore.clone();
        let counters = self.counters.clone();
        let events = self.events.clone();
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::SeqCst) % self.worker_count;

        let handle = tokio::task::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");

            let _ = events.send(DownloadEvent::Started {
                worker_id,
                uuid: uuid.clone(),
                name: name.clone(),
                track_count,
            });

            let result = run_download(&tool, &uuid, &name, track_count).await;

            counters.pending.fetch_sub(1, Ordering::SeqCst);
            if result.success {
                counters.completed.fetch_add(1, Ordering::SeqCst);
            } else {
                counters.failed.fetch_add(1, Ordering::SeqCst);
            }

            let _ = events.send(DownloadEvent::Completed {
                worker_id,
                result: result.clone(),
            });

            result
        });

        self.tasks.lock().unwrap().push(handle);
    }

    /// Waits for every dispatched download to finish, polling in short
    /// intervals so the caller can refresh a live view between polls.
    pub async fn wait_for_completion<F: FnMut()>(&self, mut on_poll: F) -> Vec<DownloadResult> {
        let mut results = Vec::new();
        loop {
            let mut tasks = self.tasks.lock().unwrap();
            if tasks.is_empty() {
                break;
            }
            let mut still_pending = Vec::new();
            for task in tasks.drain(..) {
                if task.is_finished() {
                    if let Ok(result) = task.await {
                        results.push(result);
                    }
                } else {
                    still_pending.push(task);
                }
            }
            *tasks = still_pending;
            drop(tasks);

            if self.tasks.lock().unwrap().is_empty() {
                break;
            }
            on_poll();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        results
    }
}

/// Extracts the first stderr/stdout line containing "error"
/// (case-insensitive), truncated to 200 characters. Falls back to raw
/// stderr, then stdout, then `"Exit code N"`.
fn extract_failure_reason(exit_code: Option<i32>, stdout: &str, stderr: &str) -> String {
    let find_error_line = |text: &str| -> Option<String> {
        text.lines()
            .find(|line| line.to_lowercase().contains("error"))
            .map(|line| line.chars().take(200).collect())
    };

    find_error_line(stderr)
        .or_else(|| find_error_line(stdout))
        .or_else(|| {
            if !stderr.trim().is_empty() {
                Some(stderr.chars().take(200).collect())
            } else {
                None
            }
        })
        .or_else(|| {
            if !stdout.trim().is_empty() {
                Some(stdout.chars().take(200).collect())
            } else {
                None
            }
        })
        .unwrap_or_else(|| match exit_code {
            Some(code) => format!("Exit code {code}"),
            None => "Exit code unknown".to_string(),
        })
}

async fn run_download(
    tool: &str,
    uuid: &str,
    name: &str,
    track_count: Option<usize>,
) -> DownloadResult {
    let timeout = dynamic_timeout(track_count);
    let playlist_arg = format!("playlist/{uuid}");

    let invocation = Command::new(tool)
        .args(["download", "--skip-errors", "url", &playlist_arg])
        .output();

    match tokio::time::timeout(timeout, invocation).await {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if output.status.success() {
                DownloadResult {
                    uuid: uuid.to_string(),
                    name: name.to_string(),
                    success: true,
                    message: String::new(),
                }
            } else {
                let message = extract_failure_reason(output.status.code(), &stdout, &stderr);
                DownloadResult {
                    uuid: uuid.to_string(),
                    name: name.to_string(),
                    success: false,
                    message,
                }
            }
        }
        Ok(Err(err)) => DownloadResult {
            uuid: uuid.to_string(),
            name: name.to_string(),
            success: false,
            message: format!("failed to launch downloader: {err}"),
        },
        Err(_) => DownloadResult {
            uuid: uuid.to_string(),
            name: name.to_string(),
            success: false,
            message: "download timed out".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_timeout_uses_minimum_for_small_playlists() {
        assert_eq!(dynamic_timeout(Some(5)), Duration::from_secs(600));
    }

    #[test]
    fn dynamic_timeout_scales_with_track_count() {
        assert_eq!(dynamic_timeout(Some(100)), Duration::from_secs(3000));
    }

    #[test]
    fn dynamic_timeout_falls_back_when_unknown() {
        assert_eq!(dynamic_timeout(None), Duration::from_secs(7200));
    }

    #[test]
    fn extract_failure_reason_prefers_error_line_in_stderr() {
        let reason = extract_failure_reason(Some(1), "ok\n", "warn\nerror: boom\nmore\n");
        assert_eq!(reason, "error: boom");
    }

    #[test]
    fn extract_failure_reason_falls_back_to_exit_code() {
        let reason = extract_failure_reason(Some(2), "", "");
        assert_eq!(reason, "Exit code 2");
    }
}
