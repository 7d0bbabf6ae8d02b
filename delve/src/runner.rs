//! Research runner: wires collaborators into the five nodes and runs one query.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::{ResearchConfig, RunConfig};
use crate::corpus::CorpusIndex;
use crate::error::AgentError;
use crate::generator::Generator;
use crate::graph::{ResearchEvent, ResearchLoop, ResearchNodes};
use crate::llm::LlmClient;
use crate::nodes::{AnalyserNode, CompilerNode, PickerNode, PlannerNode, ResearcherNode};
use crate::search::WebSearch;
use crate::state::ResearchState;

/// Builds the initial state for a run.
pub fn build_initial_state(query: &str, max_iterations: u32) -> ResearchState {
    ResearchState::new(query, max_iterations)
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub run_id: Uuid,
    pub report: String,
    pub state: ResearchState,
}

/// Owns the research loop for a fixed set of collaborators; runs are independent.
pub struct ResearchRunner {
    research_loop: ResearchLoop,
    max_iterations: u32,
}

impl ResearchRunner {
    /// All nodes share `generator`; the researcher retrieves `retrieval_k` chunks per question.
    pub fn new(
        generator: Arc<Generator>,
        corpus: Arc<dyn CorpusIndex>,
        retrieval_k: usize,
        max_iterations: u32,
    ) -> Self {
        let nodes = ResearchNodes {
            planner: Arc::new(PlannerNode::new(Arc::clone(&generator))),
            picker: Arc::new(PickerNode::new(Arc::clone(&generator))),
            researcher: Arc::new(ResearcherNode::new(
                Arc::clone(&generator),
                corpus,
                retrieval_k,
            )),
            analyser: Arc::new(AnalyserNode::new(Arc::clone(&generator))),
            compiler: Arc::new(CompilerNode::new(generator)),
        };
        Self {
            research_loop: ResearchLoop::new(nodes),
            max_iterations: max_iterations.max(1),
        }
    }

    /// Builds the generator from `config` (call policy, optional web search) and the nodes.
    pub fn from_config(
        config: &ResearchConfig,
        llm: Arc<dyn LlmClient>,
        corpus: Arc<dyn CorpusIndex>,
        search: Option<Arc<dyn WebSearch>>,
    ) -> Self {
        let mut generator = Generator::new(llm).with_policy(config.call_policy());
        if let Some(search) = search {
            generator = generator.with_search(search, config.search_max_results);
        }
        Self::new(
            Arc::new(generator),
            corpus,
            config.retrieval_k,
            config.max_iterations,
        )
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Runs one query with a fresh run id.
    pub async fn invoke(&self, query: &str) -> Result<ResearchOutcome, AgentError> {
        self.invoke_with_callback(query, RunConfig::new(), None::<fn(ResearchEvent)>)
            .await
    }

    /// Runs one query, reporting progress to `on_event`. Every log line of the
    /// run carries `run_id` through the `research_run` span.
    pub async fn invoke_with_callback<F>(
        &self,
        query: &str,
        run: RunConfig,
        on_event: Option<F>,
    ) -> Result<ResearchOutcome, AgentError>
    where
        F: FnMut(ResearchEvent),
    {
        let span = tracing::info_span!("research_run", run_id = %run.run_id);
        let state = build_initial_state(query, self.max_iterations);
        let state = self
            .research_loop
            .run_with_callback(state, on_event)
            .instrument(span)
            .await?;
        let report = state
            .report
            .clone()
            .ok_or_else(|| AgentError::EmptyGeneration {
                node: "compiler".to_string(),
            })?;
        Ok(ResearchOutcome {
            run_id: run.run_id,
            report,
            state,
        })
    }
}
