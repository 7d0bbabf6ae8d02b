//! Research run error types.
//!
//! `AgentError` is what every node and the loop controller return. Lower layers
//! (corpus, web search) have their own error enums that convert into it.

use std::time::Duration;

use thiserror::Error;

use crate::corpus::CorpusError;
use crate::search::SearchError;

/// Error returned by a node, the generator, or the research loop.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The corpus could not be queried. Aborts the run.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] CorpusError),

    /// LLM transport failure, rate limit or server error. Retried.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The LLM API refused the request (bad arguments, auth, quota). Not retried.
    #[error("generation rejected: {0}")]
    GenerationRejected(String),

    /// The model answered with empty text.
    #[error("empty generation in node {node}")]
    EmptyGeneration { node: String },

    /// Web search failed inside a tool round.
    #[error("web search failed: {0}")]
    Search(#[from] SearchError),

    /// A per-call deadline elapsed on the last attempt.
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// The controller made more transitions than the run can legally need.
    #[error("step budget of {0} transitions exceeded")]
    StepBudgetExceeded(usize),
}

impl AgentError {
    /// Whether another attempt of the same call may succeed.
    ///
    /// Rejected requests, empty generations and controller faults are not retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AgentError::Generation(_) | AgentError::Timeout { .. } => true,
            AgentError::Retrieval(e) => e.is_transient(),
            AgentError::Search(e) => e.is_transient(),
            AgentError::GenerationRejected(_)
            | AgentError::EmptyGeneration { .. }
            | AgentError::StepBudgetExceeded(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display of Generation contains the prefix and the message.
    #[test]
    fn agent_error_display_generation() {
        let err = AgentError::Generation("rate limited".to_string());
        let s = err.to_string();
        assert!(s.contains("generation failed"), "{}", s);
        assert!(s.contains("rate limited"), "{}", s);
    }

    /// **Scenario**: Timeout names the operation and the elapsed deadline.
    #[test]
    fn agent_error_display_timeout() {
        let err = AgentError::Timeout {
            operation: "llm".into(),
            after: Duration::from_secs(3),
        };
        assert_eq!(err.to_string(), "llm timed out after 3s");
    }

    /// **Scenario**: CorpusError and SearchError convert via `?`.
    #[test]
    fn agent_error_from_lower_layers() {
        let e: AgentError = CorpusError::Storage("disk".into()).into();
        assert!(matches!(e, AgentError::Retrieval(_)));
        let e: AgentError = SearchError::MissingApiKey.into();
        assert!(matches!(e, AgentError::Search(_)));
    }

    /// **Scenario**: empty generations and budget faults are never retried.
    #[test]
    fn agent_error_transient_classification() {
        assert!(AgentError::Generation("x".into()).is_transient());
        assert!(!AgentError::GenerationRejected("invalid_api_key".into()).is_transient());
        assert!(!AgentError::EmptyGeneration { node: "planner".into() }.is_transient());
        assert!(!AgentError::StepBudgetExceeded(12).is_transient());
        assert!(!AgentError::Search(SearchError::MissingApiKey).is_transient());
        assert!(AgentError::Search(SearchError::Transport("reset".into())).is_transient());
    }
}
