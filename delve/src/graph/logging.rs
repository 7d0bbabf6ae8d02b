//! Logging helpers for the research loop.
//!
//! Structured `tracing` events for node execution, routing and run lifecycle.

use super::Phase;
use crate::state::ResearchState;

/// Log node execution start.
pub fn log_node_start(node_id: &str, state: &ResearchState) {
    tracing::debug!(
        node_id,
        iteration = state.iteration(),
        backlog = state.sub_questions().len(),
        notes = state.notes().len(),
        "Starting node execution"
    );
}

/// Log node execution completion and the phase chosen next.
pub fn log_node_complete(node_id: &str, next: Phase) {
    tracing::debug!(node_id, %next, "Node execution complete");
}

/// Log run start.
pub fn log_run_start(query: &str, max_iterations: u32) {
    tracing::info!(query, max_iterations, "Starting research run");
}

/// Log run completion.
pub fn log_run_complete(state: &ResearchState) {
    tracing::info!(
        iterations = state.iteration(),
        notes = state.notes().len(),
        bookmarks = state.bookmarks().len(),
        "Research run complete"
    );
}

/// Log run error.
pub fn log_run_error(error: &crate::error::AgentError) {
    tracing::error!(%error, "Research run failed");
}
