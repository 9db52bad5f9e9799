/// Run state definitions for the traversal state machine
///
/// A run starts `Idle`, cycles through page fetching, link extraction and
/// link processing, and ends in `Done` or `Failed`.
use std::fmt;

/// Represents the current state of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    // ===== Active States =====
    /// Run created, nothing fetched yet
    Idle,

    /// A catalog page is being fetched
    FetchingPage,

    /// Links are being read from a saved catalog page
    ExtractingLinks,

    /// Links of the current page are being classified and gated
    ProcessingLinks,

    /// A continuation link is being followed
    Recursing,

    /// A terminal download is being handed to the dispatch strategy
    Dispatching,

    /// Waiting for outstanding downloads to finish
    Draining,

    // ===== Terminal States =====
    /// Run finished normally
    Done,

    /// Run aborted by a fatal error
    Failed,
}

impl RunState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    ///
    /// Every active state may fail.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;

        if next == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Idle, FetchingPage)
                | (FetchingPage, ExtractingLinks)
                | (FetchingPage, ProcessingLinks)
                | (FetchingPage, Done)
                | (ExtractingLinks, ProcessingLinks)
                | (ProcessingLinks, Recursing)
                | (ProcessingLinks, Dispatching)
                | (ProcessingLinks, Draining)
                | (Recursing, FetchingPage)
                | (Recursing, ProcessingLinks)
                | (Dispatching, ProcessingLinks)
                | (Draining, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingPage => "fetching_page",
            Self::ExtractingLinks => "extracting_links",
            Self::ProcessingLinks => "processing_links",
            Self::Recursing => "recursing",
            Self::Dispatching => "dispatching",
            Self::Draining => "draining",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible run states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::FetchingPage,
            Self::ExtractingLinks,
            Self::ProcessingLinks,
            Self::Recursing,
            Self::Dispatching,
            Self::Draining,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
