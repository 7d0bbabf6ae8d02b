//! Picker: chooses the next sub-question and removes it from the backlog.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use crate::error::AgentError;
use crate::generator::{Generator, ToolSet};
use crate::graph::Node;
use crate::message::Message;
use crate::prompts::{PromptVars, PICKER};
use crate::state::ResearchState;

use super::notes_block;

fn first_integer() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").ok()).as_ref()
}

fn normalize(s: &str) -> String {
    s.trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Index into `candidates` named by the model's answer.
///
/// An answer equal to one of the candidates (ignoring case and spacing) wins;
/// otherwise the first integer in the answer is read as a 1-based position.
/// `None` when neither applies.
pub fn parse_selection(answer: &str, candidates: &[String]) -> Option<usize> {
    let wanted = normalize(answer);
    if let Some(i) = candidates.iter().position(|c| normalize(c) == wanted) {
        return Some(i);
    }
    let n: usize = first_integer()?.find(answer)?.as_str().parse().ok()?;
    (1..=candidates.len()).contains(&n).then(|| n - 1)
}

pub struct PickerNode {
    generator: Arc<Generator>,
}

impl PickerNode {
    pub fn new(generator: Arc<Generator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Node<ResearchState> for PickerNode {
    fn id(&self) -> &str {
        "picker"
    }

    async fn run(&self, mut state: ResearchState) -> Result<ResearchState, AgentError> {
        if state.sub_questions().is_empty() {
            tracing::debug!("no sub-questions left to pick");
            return Ok(state);
        }

        let numbered = state
            .sub_questions()
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n");
        let vars = PromptVars::new()
            .set("original_query", state.original_query())
            .set("sub_questions", numbered)
            .set("notes", notes_block(&state));
        let generation = self
            .generator
            .complete(&PICKER, &vars, &[], &ToolSet::none())
            .await?;

        let index = match parse_selection(&generation.text, state.sub_questions()) {
            Some(i) => i,
            None => {
                tracing::warn!(
                    answer = %generation.text.trim(),
                    "picker answer matched no sub-question; taking the first"
                );
                0
            }
        };
        let Some(question) = state.take_sub_question(index) else {
            return Ok(state);
        };

        tracing::info!(question = %question, remaining = state.sub_questions().len(), "Selected");
        state.push_message(Message::assistant(format!("Selected: {}", question)));
        state.current_question = question;
        Ok(state)
    }
}
