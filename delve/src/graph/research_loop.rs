//! Loop controller: drives the five nodes through the [`Phase`] state machine.
//!
//! Planner → Picker → Researcher → Analyser → {Picker | Compiler} → Done.

use std::sync::Arc;

use crate::error::AgentError;
use crate::state::ResearchState;

use super::logging::{log_node_complete, log_node_start, log_run_complete, log_run_error, log_run_start};
use super::{Node, Phase};

/// Progress reported by [`ResearchLoop::run_with_callback`].
#[derive(Debug, Clone)]
pub enum ResearchEvent {
    /// A node is about to run.
    NodeEnter { node_id: String, phase: Phase },
    /// A node returned; carries the state it produced and the phase chosen next.
    NodeExit {
        node_id: String,
        next: Phase,
        state: ResearchState,
    },
    /// The compiler produced the final report.
    ReportReady(String),
}

/// The nodes run by each phase.
pub struct ResearchNodes {
    pub planner: Arc<dyn Node<ResearchState>>,
    pub picker: Arc<dyn Node<ResearchState>>,
    pub researcher: Arc<dyn Node<ResearchState>>,
    pub analyser: Arc<dyn Node<ResearchState>>,
    pub compiler: Arc<dyn Node<ResearchState>>,
}

impl ResearchNodes {
    fn for_phase(&self, phase: Phase) -> Option<&Arc<dyn Node<ResearchState>>> {
        match phase {
            Phase::Planning => Some(&self.planner),
            Phase::Picking => Some(&self.picker),
            Phase::Researching => Some(&self.researcher),
            Phase::Analysing => Some(&self.analyser),
            Phase::Compiling => Some(&self.compiler),
            Phase::Done => None,
        }
    }
}

/// Upper bound on node runs for a state capped at `max_iterations` passes.
///
/// Each pass is picker + researcher + analyser; planner and compiler add two,
/// plus one slack step.
pub fn step_budget(max_iterations: u32) -> usize {
    max_iterations as usize * 3 + 3
}

/// Sequential controller over a fixed set of nodes.
pub struct ResearchLoop {
    nodes: ResearchNodes,
}

impl ResearchLoop {
    pub fn new(nodes: ResearchNodes) -> Self {
        Self { nodes }
    }

    /// Runs from `Planning` to `Done` and returns the final state.
    pub async fn run(&self, state: ResearchState) -> Result<ResearchState, AgentError> {
        self.run_with_callback(state, None::<fn(ResearchEvent)>)
            .await
    }

    /// Like [`run`](Self::run), reporting each node enter/exit and the report to `on_event`.
    pub async fn run_with_callback<F>(
        &self,
        state: ResearchState,
        mut on_event: Option<F>,
    ) -> Result<ResearchState, AgentError>
    where
        F: FnMut(ResearchEvent),
    {
        log_run_start(state.original_query(), state.max_iterations());
        let result = self.drive(state, &mut on_event).await;
        match &result {
            Ok(state) => log_run_complete(state),
            Err(e) => log_run_error(e),
        }
        result
    }

    async fn drive<F>(
        &self,
        mut state: ResearchState,
        on_event: &mut Option<F>,
    ) -> Result<ResearchState, AgentError>
    where
        F: FnMut(ResearchEvent),
    {
        let budget = step_budget(state.max_iterations());
        let mut phase = Phase::Planning;
        let mut steps = 0usize;

        while let Some(node) = self.nodes.for_phase(phase) {
            steps += 1;
            if steps > budget {
                return Err(AgentError::StepBudgetExceeded(budget));
            }

            let node_id = node.id().to_string();
            log_node_start(&node_id, &state);
            if let Some(cb) = on_event.as_mut() {
                cb(ResearchEvent::NodeEnter {
                    node_id: node_id.clone(),
                    phase,
                });
            }

            state = node.run(state).await?;
            let next = phase.next(&state);
            log_node_complete(&node_id, next);

            if let Some(cb) = on_event.as_mut() {
                cb(ResearchEvent::NodeExit {
                    node_id,
                    next,
                    state: state.clone(),
                });
                if phase == Phase::Compiling {
                    if let Some(report) = &state.report {
                        cb(ResearchEvent::ReportReady(report.clone()));
                    }
                }
            }
            phase = next;
        }

        Ok(state)
    }
}
