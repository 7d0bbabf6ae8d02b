//! Research loop runtime: node trait, phase state machine, controller, retry.

mod logging;
mod node;
mod phase;
mod research_loop;
mod retry;

pub use node::Node;
pub use phase::Phase;
pub use research_loop::{step_budget, ResearchEvent, ResearchLoop, ResearchNodes};
pub use retry::{CallPolicy, RetryPolicy, DEFAULT_CALL_TIMEOUT};
