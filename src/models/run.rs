use std::path::PathBuf;

/// A single invocation of the migration pipeline. Created at entry,
/// dropped at exit; every per-playlist artifact lives underneath its log
/// directory.
#[derive(Debug, Clone)]
pub struct MigrationRun {
    pub run_id: String,
    pub log_dir: PathBuf,
    pub download_root: PathBuf,
    pub source_playlists: Vec<String>,
    pub migration_workers: usize,
    pub download_workers: usize,
}

impl MigrationRun {
    /// Builds a run rooted at `<log_root>/<tool>/<YYYYMMDD-HHMMSS>-runlog/`.
    pub fn new(
        timestamp: &str,
        log_root: &str,
        tool: &str,
        download_root: &str,
        source_playlists: Vec<String>,
        migration_workers: usize,
        download_workers: usize,
    ) -> Self {
        let log_dir = PathBuf::from(log_root)
            .join(tool)
            .join(format!("{timestamp}-runlog"));
        Self {
            run_id: timestamp.to_string(),
            log_dir,
            download_root: PathBuf::from(download_root),
            source_playlists,
            migration_workers,
            download_workers,
        }
    }
}
