//! The two commands: one research run, and directory ingestion.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use delve::{
    AgentError, ChatOpenAI, ChunkerConfig, ConfigError, CorpusError, CorpusIndex, ExaSearch,
    IngestReport, Ingestor, OpenAIEmbedder, ResearchConfig, ResearchEvent, ResearchOutcome,
    ResearchRunner, RunConfig, SqliteCorpus, WebSearch,
};
use thiserror::Error;

pub const GREETING: &str = "Welcome to Delve. What would you like to research?";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("corpus: {0}")]
    Corpus(#[from] CorpusError),
    #[error("no research query given")]
    EmptyQuery,
    #[error("read query: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_iterations: Option<u32>,
    pub no_web: bool,
    pub verbose: bool,
}

/// Greets on `out` and reads one trimmed line from `input`.
pub fn read_query<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<String, RunError> {
    writeln!(out, "{}", GREETING)?;
    write!(out, "> ")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let query = line.trim();
    if query.is_empty() {
        return Err(RunError::EmptyQuery);
    }
    Ok(query.to_string())
}

fn open_corpus(config: &ResearchConfig) -> Result<SqliteCorpus, CorpusError> {
    let embedder = Arc::new(OpenAIEmbedder::new(&config.embedding_model));
    SqliteCorpus::open(&config.corpus_path, embedder)
}

fn web_search(config: &ResearchConfig, opts: &RunOptions) -> Option<Arc<dyn WebSearch>> {
    if opts.no_web {
        return None;
    }
    match &config.exa_api_key {
        Some(key) => Some(Arc::new(ExaSearch::new(key.clone()))),
        None => {
            tracing::info!("EXA_API_KEY not set; web search disabled");
            None
        }
    }
}

/// Builds every collaborator from the environment and runs `query` once.
pub async fn run_research(query: &str, opts: &RunOptions) -> Result<ResearchOutcome, RunError> {
    let mut config = ResearchConfig::from_env()?;
    if let Some(n) = opts.max_iterations {
        config.max_iterations = n.max(1);
    }

    let llm = Arc::new(ChatOpenAI::new(&config.model).with_temperature(config.temperature));
    let corpus = Arc::new(open_corpus(&config)?);
    let size = corpus.len().await?;
    if size == 0 {
        tracing::warn!(path = %config.corpus_path.display(), "corpus is empty; run `delve ingest` first");
    }
    let search = web_search(&config, opts);
    let runner = ResearchRunner::from_config(&config, llm, corpus, search);

    let verbose = opts.verbose;
    let outcome = runner
        .invoke_with_callback(
            query,
            RunConfig::new(),
            Some(move |event: ResearchEvent| {
                if let ResearchEvent::NodeEnter { node_id, .. } = event {
                    if verbose {
                        eprintln!("Entering: {}", node_id);
                    }
                }
            }),
        )
        .await?;
    Ok(outcome)
}

/// Ingests `dir` into the configured corpus; returns the report and the corpus size afterwards.
pub async fn run_ingest(dir: &Path, chunker: ChunkerConfig) -> Result<(IngestReport, usize), RunError> {
    let config = ResearchConfig::from_env()?;
    let corpus = open_corpus(&config)?;
    let report = Ingestor::new(chunker)
        .with_policy(config.call_policy())
        .ingest_dir(&corpus, dir)
        .await?;
    let total = corpus.len().await?;
    Ok((report, total))
}
