//! Runnable entry point for the migration core. CLI argument parsing and
//! credential acquisition are out of scope for this crate (see
//! `MigrationConfig`); this binary only wires the already-configured pieces
//! together from environment variables so the crate is runnable end to end.

use std::sync::Arc;

use catalog_migrate::catalog::{HttpSourceCatalogClient, HttpTargetCatalogClient, HttpUniversalLinkClient};
use catalog_migrate::download::DownloadOrchestrator;
use catalog_migrate::models::MigrationRun;
use catalog_migrate::pipeline::{MigrationPipeline, SourcePlaylistRef};
use catalog_migrate::rate_limit::SlidingWindowLimiter;
use catalog_migrate::report::ReportCollector;
use catalog_migrate::ui;
use catalog_migrate::MigrationConfig;

fn env_required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("not logged in: missing {key}"))
}

fn parse_source_playlists(raw: &str) -> Vec<SourcePlaylistRef> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|entry| {
            let (id, name) = entry.split_once(':')?;
            Some(SourcePlaylistRef {
                id: id.trim().to_string(),
                name: name.trim().to_string(),
            })
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "migration run failed");
        eprintln!("{err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = MigrationConfig::from_env()?;

    let source_token = env_required("SOURCE_BEARER_TOKEN")?;
    let target_token = env_required("TARGET_BEARER_TOKEN")?;
    let target_user_id = env_required("TARGET_USER_ID")?;
    let source_api_base = std::env::var("SOURCE_API_BASE")
        .unwrap_or_else(|_| "https://api.spotify.com/v1".to_string());
    let target_api_base = std::env::var("TARGET_API_BASE")
        .unwrap_or_else(|_| "https://api.tidal.example/v1".to_string());
    let universal_link_api_base = std::env::var("UNIVERSAL_LINK_API_BASE")
        .unwrap_or_else(|_| "https://api.song.link/v1-alpha.1".to_string());

    let raw_playlists = std::env::var("SOURCE_PLAYLISTS").unwrap_or_default();
    let playlists = parse_source_playlists(&raw_playlists);
    if playlists.is_empty() {
        anyhow::bail!("SOURCE_PLAYLISTS is empty; nothing to migrate");
    }

    let run_id = std::env::var("RUN_ID").unwrap_or_else(|_| "run".to_string());
    let migration_run = MigrationRun::new(
        &run_id,
        &config.log_root,
        &config.downloader_tool,
        &config.download_root,
        playlists.iter().map(|p| p.id.clone()).collect(),
        config.migration_workers,
        config.download_workers,
    );
    tracing::info!(run_id = %migration_run.run_id, log_dir = ?migration_run.log_dir, "starting migration run");

    let source_client = Arc::new(HttpSourceCatalogClient::new(source_api_base, source_token));
    let target_client = Arc::new(HttpTargetCatalogClient::new(
        target_api_base,
        target_user_id,
        target_token,
    ));
    let universal_link_limiter = Arc::new(SlidingWindowLimiter::new(
        config.universal_link_rate_limit,
        config.universal_link_window,
    ));
    let universal_link_client = Arc::new(HttpUniversalLinkClient::new(
        universal_link_api_base,
        universal_link_limiter,
    ));

    let (downloader, download_events) =
        DownloadOrchestrator::new(config.downloader_tool.clone(), config.download_workers);
    let downloader = Arc::new(downloader);

    let (migration_events_tx, migration_events_rx) = tokio::sync::mpsc::unbounded_channel();

    let pipeline = MigrationPipeline::new(
        config.clone(),
        source_client,
        target_client,
        universal_link_client,
        downloader.clone(),
        migration_events_tx,
    );

    let ui_handle = tokio::task::spawn(ui::run_live_ui(migration_events_rx, download_events));

    let collector = Arc::new(ReportCollector::new(
        migration_run.log_dir.clone(),
        migration_run.download_root.clone(),
        config.probe_tool.clone(),
    ));
    for playlist in &playlists {
        collector.start_playlist(&playlist.name).await;
    }

    let results = pipeline.run(playlists).await;
    // Drop the pipeline so its migration-event sender closes once this run
    // is done; the UI task is waiting on both channels closing to exit.
    drop(pipeline);

    for result in &results {
        for report in &result.reports {
            collector.add_track(&result.playlist_name, report.clone()).await;
        }
    }

    let download_results = downloader.wait_for_completion(|| {}).await;
    let download_success_by_uuid: std::collections::HashMap<String, bool> = download_results
        .into_iter()
        .map(|result| (result.uuid, result.success))
        .collect();
    for result in &results {
        let success = result
            .target_uuid
            .as_ref()
            .and_then(|uuid| download_success_by_uuid.get(uuid))
            .copied()
            .unwrap_or(false);
        collector
            .mark_playlist_downloaded(&result.playlist_name, success)
            .await;
    }
    drop(downloader);

    let _ = ui_handle.await;

    collector.finalize_and_write_reports().await?;
    tracing::info!(playlists = results.len(), "migration run complete");
    Ok(())
}
