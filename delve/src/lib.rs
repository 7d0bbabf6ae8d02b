//! # Delve
//!
//! Iterative deep-research agent. A query is decomposed into sub-questions,
//! each is researched against a document corpus (and optionally the web), an
//! analyser decides when enough depth has been reached, and a compiler writes
//! the final cited report.
//!
//! ## Main modules
//!
//! - [`state`]: [`ResearchState`], the record threaded through every node.
//! - [`graph`]: [`Node`] trait, [`Phase`] state machine, [`ResearchLoop`], [`RetryPolicy`].
//! - [`nodes`]: planner, picker, researcher, analyser, compiler.
//! - [`generator`]: [`Generator`] over an [`LlmClient`] with one web-search tool round.
//! - [`corpus`]: [`CorpusIndex`] with in-memory and sqlite-vec stores, chunking and ingestion.
//! - [`search`]: [`WebSearch`] and the Exa client.
//! - [`runner`]: [`ResearchRunner`], the entry point used by the CLI.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use delve::{ChatOpenAI, InMemoryCorpus, OpenAIEmbedder, ResearchConfig, ResearchRunner};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResearchConfig::from_env()?;
//! let llm = Arc::new(ChatOpenAI::new(&config.model).with_temperature(config.temperature));
//! let corpus = Arc::new(InMemoryCorpus::new(Arc::new(OpenAIEmbedder::new(&config.embedding_model))));
//! let runner = ResearchRunner::from_config(&config, llm, corpus, None);
//! let outcome = runner.invoke("Compare X and Y").await?;
//! println!("{}", outcome.report);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod generator;
pub mod graph;
pub mod llm;
pub mod message;
pub mod nodes;
pub mod prompts;
pub mod runner;
pub mod search;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, ResearchConfig, RunConfig};
pub use corpus::{
    ingest_dir, ChunkMetadata, ChunkRecord, ChunkerConfig, CorpusError, CorpusIndex, Embedder,
    InMemoryCorpus, IngestReport, Ingestor, OpenAIEmbedder, RetrievedChunk, SqliteCorpus,
    TextChunker,
};
pub use error::AgentError;
pub use generator::{Capability, Generation, Generator, ToolSet};
pub use graph::{CallPolicy, Node, Phase, ResearchEvent, ResearchLoop, ResearchNodes, RetryPolicy};
pub use llm::{ChatOpenAI, LlmClient, LlmResponse, LlmUsage, MockLlm, ToolCall, ToolSpec};
pub use message::Message;
pub use runner::{build_initial_state, ResearchOutcome, ResearchRunner};
pub use search::{ExaSearch, SearchError, SearchHit, WebSearch};
pub use state::ResearchState;
