//! Analyser: counts the pass and decides whether to stop researching.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::generator::{Generator, ToolSet};
use crate::graph::Node;
use crate::message::Message;
use crate::prompts::{PromptVars, ANALYSER};
use crate::state::ResearchState;

use super::notes_block;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Converge,
    Continue,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Converge => "CONVERGE",
            Decision::Continue => "CONTINUE",
        })
    }
}

/// `Converge` when the answer's first word is CONVERGE (any case, surrounding
/// punctuation ignored); anything else, including noise, is `Continue`.
pub fn parse_decision(answer: &str) -> Decision {
    let word: String = answer
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .chars()
        .take_while(|c| c.is_alphabetic())
        .collect();
    if word.eq_ignore_ascii_case("CONVERGE") {
        Decision::Converge
    } else {
        Decision::Continue
    }
}

pub struct AnalyserNode {
    generator: Arc<Generator>,
}

impl AnalyserNode {
    pub fn new(generator: Arc<Generator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Node<ResearchState> for AnalyserNode {
    fn id(&self) -> &str {
        "analyser"
    }

    async fn run(&self, mut state: ResearchState) -> Result<ResearchState, AgentError> {
        let iteration = state.advance_iteration();

        let vars = PromptVars::new()
            .set("iteration", iteration.to_string())
            .set("notes", notes_block(&state));
        let generation = self
            .generator
            .complete(&ANALYSER, &vars, state.messages(), &ToolSet::none())
            .await?;

        let decision = parse_decision(&generation.text);
        let cap_reached = state.iteration_cap_reached();
        state.converged = decision == Decision::Converge || cap_reached;
        tracing::info!(
            iteration,
            max_iterations = state.max_iterations(),
            %decision,
            cap_reached,
            converged = state.converged,
            answer = %generation.text.trim(),
            "Decision"
        );
        state.push_message(Message::assistant(format!("Decision: {}", decision)));
        Ok(state)
    }
}
