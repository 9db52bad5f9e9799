//! Completion counter shared between the control loop and download workers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts dispatched links for a single run
///
/// The count grows when a link is handed off, not when its download
/// finishes, so the cap check stays deterministic in concurrent mode.
#[derive(Debug, Clone, Default)]
pub struct CompletionCounter {
    count: Arc<AtomicUsize>,
}

impl CompletionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one dispatch and returns the new count
    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Returns true once the count has reached `limit`
    pub fn has_reached(&self, limit: usize) -> bool {
        self.get() >= limit
    }
}
