//! Researcher: answers the current sub-question from the corpus, or the web.

use std::sync::Arc;

use async_trait::async_trait;

use crate::corpus::{CorpusIndex, RetrievedChunk};
use crate::error::AgentError;
use crate::generator::{Generation, Generator, ToolSet};
use crate::graph::Node;
use crate::message::Message;
use crate::prompts::{PromptVars, RESEARCHER};
use crate::state::ResearchState;

/// Bookmark recorded when neither the corpus nor the web contributed.
pub const NO_SOURCE_BOOKMARK: &str = "model knowledge (no retrieved source)";

pub struct ResearcherNode {
    generator: Arc<Generator>,
    corpus: Arc<dyn CorpusIndex>,
    k: usize,
}

impl ResearcherNode {
    pub fn new(generator: Arc<Generator>, corpus: Arc<dyn CorpusIndex>, k: usize) -> Self {
        Self {
            generator,
            corpus,
            k,
        }
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedChunk>, AgentError> {
        let corpus = &self.corpus;
        let k = self.k;
        self.generator
            .policy()
            .call("retrieve", move || async move {
                corpus.retrieve(question, k).await.map_err(AgentError::from)
            })
            .await
    }

    /// One citation per distinct chunk source, then one per web result.
    fn bookmarks(chunks: &[RetrievedChunk], generation: &Generation) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let citations = chunks
            .iter()
            .map(|c| c.metadata.citation())
            .chain(generation.web_results.iter().map(|h| h.citation()));
        for citation in citations {
            if !out.contains(&citation) {
                out.push(citation);
            }
        }
        if out.is_empty() {
            out.push(NO_SOURCE_BOOKMARK.to_string());
        }
        out
    }
}

#[async_trait]
impl Node<ResearchState> for ResearcherNode {
    fn id(&self) -> &str {
        "researcher"
    }

    async fn run(&self, mut state: ResearchState) -> Result<ResearchState, AgentError> {
        if state.current_question.trim().is_empty() {
            tracing::debug!("no current question; nothing to research");
            return Ok(state);
        }
        let question = state.current_question.clone();

        let chunks = self.retrieve(&question).await?;
        tracing::debug!(question = %question, retrieved = chunks.len(), "retrieved context");
        let context = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let vars = PromptVars::new()
            .set("current_question", question.as_str())
            .set("context", context);
        let generation = self
            .generator
            .complete(&RESEARCHER, &vars, state.messages(), &ToolSet::web_search())
            .await?;

        for bookmark in Self::bookmarks(&chunks, &generation) {
            state.push_bookmark(bookmark);
        }
        state.push_note(generation.text.clone());
        state.push_message(Message::assistant(generation.text));
        Ok(state)
    }
}
