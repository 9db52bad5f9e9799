//! Crawler module for catalog traversal and downloading
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching into the download directory
//! - The dispatch strategies (sequential with delay, concurrent worker pool)
//! - The shared completion counter
//! - Overall traversal coordination

mod coordinator;
mod counter;
mod dispatch;
mod fetcher;

pub use coordinator::Orchestrator;
pub use counter::CompletionCounter;
pub use dispatch::{
    default_pool_size, DispatchOutcome, Dispatcher, PoolReport, WorkerPool, DRAIN_POLL_INTERVAL,
};
pub use fetcher::{build_http_client, FetchEngine, FetchErrorKind, FetchResult, CONNECT_TIMEOUT};

use crate::config::RunConfiguration;
use crate::files::{prepare_directories, unzip_all};
use crate::output::RunSummary;
use crate::HarvestError;
use chrono::Local;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Create the save and archive directories
/// 2. Walk the catalog and download every admitted resource
/// 3. Wait for outstanding downloads
/// 4. Unpack the downloaded archives, if enabled
///
/// # Returns
///
/// * `Ok(RunSummary)` - Harvest completed (possibly with nothing to download)
/// * `Err(HarvestError)` - Setup failed or a fatal fetch aborted the run
///
/// # Example
///
/// ```no_run
/// use harvest_dl::config::{Config, RunConfiguration};
/// use harvest_dl::crawler::run_harvest;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RunConfiguration::new(&Config::default())?;
/// let summary = run_harvest(config).await?;
/// println!("{} files downloaded", summary.downloaded);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: RunConfiguration) -> crate::Result<RunSummary> {
    prepare_directories(&config)?;
    log_parameters(&config);

    tracing::info!("BEGIN DOWNLOAD {}", Local::now().format(TIMESTAMP_FORMAT));
    let result = harvest(&config).await;
    tracing::info!("END DOWNLOAD {}", Local::now().format(TIMESTAMP_FORMAT));

    result
}

async fn harvest(config: &RunConfiguration) -> crate::Result<RunSummary> {
    let mut orchestrator = Orchestrator::new(config.clone())?;
    let mut summary = orchestrator.run().await?;

    if config.unzip() {
        let zips = config.zips_path();
        let save = config.save_path().to_path_buf();
        tracing::info!("Unzipping files from {} into {}", zips.display(), save.display());

        let report = tokio::task::spawn_blocking(move || unzip_all(&zips, &save))
            .await
            .map_err(|e| HarvestError::Io(std::io::Error::other(e)))??;

        if !report.corrupt.is_empty() {
            tracing::warn!("{} archives could not be unzipped", report.corrupt.len());
        }
        if !report.rejected.is_empty() {
            tracing::warn!("{} archive entries were skipped", report.rejected.len());
        }
        summary.extracted_files = report.files;
    }

    Ok(summary)
}

fn log_parameters(config: &RunConfiguration) {
    let max_files = if config.is_unbounded() {
        "all".to_string()
    } else {
        config.max_files().to_string()
    };

    tracing::info!("Parameters:");
    tracing::info!("  File type: {}", config.file_type());
    tracing::info!("  Language: {}", config.language());
    tracing::info!("  Save path: {}", config.save_path().display());
    tracing::info!("  Overwrite: {}", config.overwrite());
    tracing::info!("  Delay: {} ms", config.delay().as_millis());
    tracing::info!("  Max files: {}", max_files);
    tracing::info!("  Engine: {}", config.engine());
    tracing::info!("  Mode: {}", config.mode());
    tracing::info!("  Unzip: {}", config.unzip());
    tracing::info!("  Catalog: {}", config.base_url());
}
