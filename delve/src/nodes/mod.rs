//! The five research nodes. Each implements [`Node<ResearchState>`](crate::graph::Node)
//! and shares one [`Generator`](crate::generator::Generator).

mod analyser;
mod compiler;
mod picker;
mod planner;
mod researcher;

pub use analyser::{parse_decision, AnalyserNode, Decision};
pub use compiler::CompilerNode;
pub use picker::{parse_selection, PickerNode};
pub use planner::{parse_sub_questions, PlannerNode};
pub use researcher::{ResearcherNode, NO_SOURCE_BOOKMARK};

use crate::state::ResearchState;

/// Notes joined one per line, as shown to the model.
pub(crate) fn notes_block(state: &ResearchState) -> String {
    state.notes().join("\n")
}
