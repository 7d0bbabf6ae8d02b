//! Phases of a research run and the transition function between them.

use std::fmt;

use crate::state::ResearchState;

/// Where the loop controller currently is.
///
/// `Planning` is initial; `Done` is terminal and only reachable from `Compiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Planning,
    Picking,
    Researching,
    Analysing,
    Compiling,
    Done,
}

impl Phase {
    /// Next phase given the state produced by the node of this phase.
    ///
    /// Only `Analysing` branches: to `Compiling` when the state has converged or
    /// the backlog is empty, otherwise back to `Picking`.
    pub fn next(self, state: &ResearchState) -> Phase {
        match self {
            Phase::Planning => Phase::Picking,
            Phase::Picking => Phase::Researching,
            Phase::Researching => Phase::Analysing,
            Phase::Analysing => {
                if state.converged || state.sub_questions().is_empty() {
                    Phase::Compiling
                } else {
                    Phase::Picking
                }
            }
            Phase::Compiling | Phase::Done => Phase::Done,
        }
    }

    /// Node id run in this phase; `None` for `Done`.
    pub fn node_id(self) -> Option<&'static str> {
        match self {
            Phase::Planning => Some("planner"),
            Phase::Picking => Some("picker"),
            Phase::Researching => Some("researcher"),
            Phase::Analysing => Some("analyser"),
            Phase::Compiling => Some("compiler"),
            Phase::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Done
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Planning => "planning",
            Phase::Picking => "picking",
            Phase::Researching => "researching",
            Phase::Analysing => "analysing",
            Phase::Compiling => "compiling",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}
