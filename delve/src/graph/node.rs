//! Node trait: one step of the research loop.
//!
//! Receives state `S` and returns the updated `S`. Routing is not a node
//! concern; the loop controller decides the next phase from the returned state
//! (see [`Phase::next`](super::Phase::next)).

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AgentError;

/// One step in the loop: state in, state out.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"planner"`). Used in logs and events.
    fn id(&self) -> &str;

    /// Runs the step. An error aborts the run.
    async fn run(&self, state: S) -> Result<S, AgentError>;
}
