//! Run summary collected by the orchestrator
//!
//! Counts are filled in while the catalog is walked and completed with the
//! worker pool tally when the run drains.

use crate::crawler::PoolReport;
use chrono::{DateTime, Local};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The catalog was walked until links ran out or the cap was hit
    Completed,
    /// The first page was not a catalog listing, nothing was downloaded
    NoLinks,
}

/// Harvest run summary
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Links handed to the dispatch strategy (the capped count)
    pub dispatched: usize,

    /// Resources saved to disk
    pub downloaded: usize,

    /// Links rejected by the overwrite gate
    pub skipped: usize,

    /// Fetches that produced nothing but did not abort the run
    pub soft_failures: usize,

    /// Worker downloads that failed fatally
    pub failed: usize,

    /// Links that could not be resolved
    pub malformed: usize,

    /// Catalog pages whose links were processed
    pub pages: usize,

    /// Continuation links pointing at a page already fetched in this run
    pub revisited: usize,

    /// Files written by archive extraction
    pub extracted_files: usize,

    pub outcome: RunOutcome,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            dispatched: 0,
            downloaded: 0,
            skipped: 0,
            soft_failures: 0,
            failed: 0,
            malformed: 0,
            pages: 0,
            revisited: 0,
            extracted_files: 0,
            outcome: RunOutcome::Completed,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    /// Adds the worker pool tally collected at drain time
    pub fn absorb(&mut self, report: PoolReport) {
        self.downloaded += report.downloaded;
        self.soft_failures += report.soft_failures;
        self.failed += report.failed;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    /// Run duration in seconds, if finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    if summary.outcome == RunOutcome::NoLinks {
        println!("No links to download");
        println!();
    }

    println!("Links:");
    println!("  Dispatched: {}", summary.dispatched);
    println!("  Skipped (already downloaded): {}", summary.skipped);
    println!("  Malformed: {}", summary.malformed);
    println!();

    println!("Downloads:");
    println!("  Completed: {}", summary.downloaded);
    println!("  Timed out: {}", summary.soft_failures);
    println!("  Failed: {}", summary.failed);
    println!();

    println!("Catalog pages: {}", summary.pages);
    if summary.revisited > 0 {
        println!("Catalog pages revisited: {}", summary.revisited);
    }
    if summary.extracted_files > 0 {
        println!("Extracted files: {}", summary.extracted_files);
    }

    println!(
        "Started: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(finished) = summary.finished_at {
        println!("Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(seconds) = summary.duration_seconds() {
        println!("Duration: {}s", seconds);
    }
}
