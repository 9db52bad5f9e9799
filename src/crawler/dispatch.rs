//! Dispatch strategies for terminal downloads
//!
//! Sequential dispatch runs every fetch inline after the politeness delay.
//! Concurrent dispatch hands terminal downloads to a bounded worker pool and
//! only waits for them when the run drains.

use crate::config::DispatchMode;
use crate::crawler::fetcher::{FetchEngine, FetchErrorKind, FetchResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// How long each drain iteration waits before logging and polling again
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Worker pool size: three workers per available CPU
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 3
}

/// What happened to a dispatched download
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The fetch ran inline and finished
    Completed(FetchResult),
    /// The fetch was handed to the worker pool
    Enqueued,
}

/// Tally of worker pool results collected at drain time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub downloaded: usize,
    pub soft_failures: usize,
    pub failed: usize,
}

/// Bounded pool of download tasks
///
/// Tasks are spawned immediately and wait for a permit inside the task, so
/// submitting never blocks the control loop.
pub struct WorkerPool {
    tasks: JoinSet<FetchResult>,
    permits: Arc<Semaphore>,
    size: usize,
    accepting: bool,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(size)),
            size,
            accepting: true,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of tasks not yet collected
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Queues a download; returns false once the pool is shutting down
    pub fn submit(&mut self, engine: FetchEngine, url: Url, save_dir: PathBuf) -> bool {
        if !self.accepting {
            tracing::warn!("Worker pool is shutting down, dropping {}", url);
            return false;
        }

        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return FetchResult::FatalError {
                        kind: FetchErrorKind::Io,
                        message: "worker pool closed".to_string(),
                    }
                }
            };
            let result = engine.fetch(&url, &save_dir).await;
            if let FetchResult::FatalError { kind, message } = &result {
                tracing::error!("Download of {} failed ({}): {}", url, kind, message);
            }
            result
        });
        true
    }

    /// Stops accepting work and waits for every queued download
    ///
    /// Running downloads are never cancelled; the wait is polled in
    /// [`DRAIN_POLL_INTERVAL`] slices until the pool is empty.
    pub async fn drain(&mut self) -> PoolReport {
        self.accepting = false;
        let mut report = PoolReport::default();

        loop {
            match tokio::time::timeout(DRAIN_POLL_INTERVAL, self.tasks.join_next()).await {
                Ok(Some(Ok(result))) => match result {
                    FetchResult::Success { .. } => report.downloaded += 1,
                    FetchResult::SoftFailure => report.soft_failures += 1,
                    FetchResult::FatalError { .. } => report.failed += 1,
                },
                Ok(Some(Err(e))) => {
                    tracing::error!("Download task panicked: {}", e);
                    report.failed += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::info!("Waiting for {} downloads to finish", self.tasks.len());
                }
            }
        }

        report
    }
}

/// Dispatch strategy, fixed for the whole run
pub enum Dispatcher {
    Sequential { delay: Duration },
    Concurrent(WorkerPool),
}

impl Dispatcher {
    /// Builds the strategy for `mode`
    ///
    /// The delay only applies to sequential dispatch.
    pub fn for_mode(mode: DispatchMode, delay: Duration, pool_size: usize) -> Self {
        match mode {
            DispatchMode::Sequential => Self::Sequential { delay },
            DispatchMode::Concurrent => Self::Concurrent(WorkerPool::new(pool_size)),
        }
    }

    pub fn mode(&self) -> DispatchMode {
        match self {
            Self::Sequential { .. } => DispatchMode::Sequential,
            Self::Concurrent(_) => DispatchMode::Concurrent,
        }
    }

    /// Dispatches a terminal download
    pub async fn dispatch(
        &mut self,
        engine: &FetchEngine,
        url: &Url,
        save_dir: &Path,
    ) -> DispatchOutcome {
        match self {
            Self::Sequential { delay } => {
                politeness_delay(*delay).await;
                DispatchOutcome::Completed(engine.fetch(url, save_dir).await)
            }
            Self::Concurrent(pool) => {
                if pool.submit(engine.clone(), url.clone(), save_dir.to_path_buf()) {
                    DispatchOutcome::Enqueued
                } else {
                    DispatchOutcome::Completed(FetchResult::SoftFailure)
                }
            }
        }
    }

    /// Fetches a continuation page on the control loop, whatever the mode
    pub async fn fetch_page(
        &mut self,
        engine: &FetchEngine,
        url: &Url,
        save_dir: &Path,
    ) -> FetchResult {
        if let Self::Sequential { delay } = self {
            politeness_delay(*delay).await;
        }
        engine.fetch(url, save_dir).await
    }

    /// Waits for outstanding work; sequential dispatch has none
    pub async fn drain(&mut self) -> PoolReport {
        match self {
            Self::Sequential { .. } => PoolReport::default(),
            Self::Concurrent(pool) => pool.drain().await,
        }
    }
}

async fn politeness_delay(delay: Duration) {
    if !delay.is_zero() {
        tracing::debug!("Sleeping {} ms before next fetch", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}
