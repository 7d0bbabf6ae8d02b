//! Planner: decomposes the original query into sub-questions, once.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use crate::error::AgentError;
use crate::generator::{Generator, ToolSet};
use crate::graph::Node;
use crate::message::Message;
use crate::prompts::{PromptVars, PLANNER};
use crate::state::ResearchState;

use super::notes_block;

/// Leading `1.`, `2)`, `-`, `*` or `•` list marker.
fn list_marker() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*").ok())
        .as_ref()
}

/// One sub-question per non-blank line, list markers stripped, duplicates dropped.
pub fn parse_sub_questions(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = match list_marker() {
            Some(re) => re.replace(line, "").into_owned(),
            None => line.to_string(),
        };
        let q = line.trim();
        if !q.is_empty() && !out.iter().any(|existing| existing == q) {
            out.push(q.to_string());
        }
    }
    out
}

pub struct PlannerNode {
    generator: Arc<Generator>,
}

impl PlannerNode {
    pub fn new(generator: Arc<Generator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Node<ResearchState> for PlannerNode {
    fn id(&self) -> &str {
        "planner"
    }

    async fn run(&self, mut state: ResearchState) -> Result<ResearchState, AgentError> {
        if !state.sub_questions().is_empty() {
            tracing::debug!(
                backlog = state.sub_questions().len(),
                "sub-questions already planned; skipping"
            );
            return Ok(state);
        }

        let vars = PromptVars::new()
            .set("original_query", state.original_query())
            .set("notes", notes_block(&state));
        let generation = self
            .generator
            .complete(&PLANNER, &vars, state.messages(), &ToolSet::none())
            .await?;

        let questions = parse_sub_questions(&generation.text);
        if questions.is_empty() {
            tracing::warn!("planner produced no sub-questions");
        }
        state.add_sub_questions(questions);
        let summary = format!("Generated sub-questions: {:?}", state.sub_questions());
        tracing::info!("{}", summary);
        state.push_message(Message::assistant(summary));
        Ok(state)
    }
}
