//! Compiler: turns notes and bookmarks into the final cited report.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::generator::{Generator, ToolSet};
use crate::graph::Node;
use crate::message::Message;
use crate::prompts::{PromptVars, COMPILER};
use crate::state::ResearchState;

use super::notes_block;

pub struct CompilerNode {
    generator: Arc<Generator>,
}

impl CompilerNode {
    pub fn new(generator: Arc<Generator>) -> Self {
        Self { generator }
    }

    fn bookmarks_block(state: &ResearchState) -> String {
        state
            .bookmarks()
            .iter()
            .enumerate()
            .map(|(i, b)| format!("[{}] {}", i + 1, b))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Node<ResearchState> for CompilerNode {
    fn id(&self) -> &str {
        "compiler"
    }

    async fn run(&self, mut state: ResearchState) -> Result<ResearchState, AgentError> {
        let vars = PromptVars::new()
            .set("original_query", state.original_query())
            .set("notes", notes_block(&state))
            .set("bookmarks", Self::bookmarks_block(&state));
        let generation = self
            .generator
            .complete(&COMPILER, &vars, &[], &ToolSet::none())
            .await?;

        tracing::info!(chars = generation.text.len(), "report compiled");
        state.push_message(Message::assistant(generation.text.clone()));
        state.report = Some(generation.text);
        Ok(state)
    }
}
