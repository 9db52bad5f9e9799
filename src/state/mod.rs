//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `RunState`: the traversal state machine a run moves through (idle, fetching, processing, draining, done)

mod run_state;

pub use run_state::RunState;
