//! Output module for reporting harvest results
//!
//! This module handles:
//! - Collecting per-run counts in a [`RunSummary`]
//! - Printing the summary at the end of a run

pub mod stats;

pub use stats::{print_summary, RunOutcome, RunSummary};
