//! Document corpus: chunk storage and top-k retrieval.
//!
//! [`CorpusIndex`] is what the researcher queries. Ingestion ([`ingest`]) fills
//! it from a directory of text, markdown and PDF files, split by [`chunker`].

pub mod chunker;
mod embedder;
mod in_memory;
pub mod ingest;
mod openai_embedder;
mod sqlite;

pub use chunker::{Chunk, ChunkerConfig, TextChunker};
pub use embedder::Embedder;
pub use in_memory::InMemoryCorpus;
pub use ingest::{ingest_dir, IngestReport, Ingestor};
pub use openai_embedder::OpenAIEmbedder;
pub use sqlite::SqliteCorpus;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Corpus storage and embedding errors.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("embedding dimension {actual} != expected {expected}")]
    Dimension { expected: usize, actual: usize },
}

impl CorpusError {
    /// Embedding calls go over the network; everything else is local and deterministic.
    pub fn is_transient(&self) -> bool {
        matches!(self, CorpusError::Embedding(_))
    }
}

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source file path relative to the ingested directory, `/`-separated.
    pub source: String,
    /// 1-based page number.
    pub page: u32,
    /// Byte offset of the chunk within its page.
    pub start_offset: usize,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>, page: u32, start_offset: usize) -> Self {
        Self {
            source: source.into(),
            page,
            start_offset,
        }
    }

    /// Stable id used as the upsert key: `<source>#p<page>@<start_offset>`.
    pub fn chunk_id(&self) -> String {
        format!("{}#p{}@{}", self.source, self.page, self.start_offset)
    }

    /// Citation string used for bookmarks: `<source>, p. <page>`.
    pub fn citation(&self) -> String {
        format!("{}, p. {}", self.source, self.page)
    }
}

/// One retrieval hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Similarity in `[0, 1]`-ish range; higher is closer.
    pub score: f32,
}

/// One chunk ready for storage under a stable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl ChunkRecord {
    /// Record keyed by [`ChunkMetadata::chunk_id`].
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: metadata.chunk_id(),
            text: text.into(),
            metadata,
        }
    }
}

/// Chunk store with similarity retrieval.
#[async_trait]
pub trait CorpusIndex: Send + Sync {
    /// Inserts or replaces the chunk stored under `id`.
    async fn add_chunk(
        &self,
        id: &str,
        text: &str,
        metadata: &ChunkMetadata,
    ) -> Result<(), CorpusError>;

    /// Inserts or replaces several chunks. Stores override this to embed the
    /// whole batch in one call.
    async fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), CorpusError> {
        for chunk in chunks {
            self.add_chunk(&chunk.id, &chunk.text, &chunk.metadata).await?;
        }
        Ok(())
    }

    /// Deletes every chunk whose metadata names `source`; returns how many went.
    async fn remove_source(&self, source: &str) -> Result<usize, CorpusError>;

    /// Up to `k` chunks most similar to `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, CorpusError>;

    /// Number of stored chunks.
    async fn len(&self) -> Result<usize, CorpusError>;

    async fn is_empty(&self) -> Result<bool, CorpusError> {
        Ok(self.len().await? == 0)
    }
}

/// Embeds `texts` in one call; checks the count and every dimension.
pub(crate) async fn embed_batch(
    embedder: &dyn Embedder,
    texts: &[&str],
) -> Result<Vec<Vec<f32>>, CorpusError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let vectors = embedder.embed(texts).await?;
    if vectors.len() != texts.len() {
        return Err(CorpusError::Embedding(format!(
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        )));
    }
    let expected = embedder.dimension();
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(CorpusError::Dimension {
            expected,
            actual: bad.len(),
        });
    }
    Ok(vectors)
}

/// Embeds one text and checks the dimension.
pub(crate) async fn embed_one(
    embedder: &dyn Embedder,
    text: &str,
) -> Result<Vec<f32>, CorpusError> {
    embed_batch(embedder, &[text])
        .await?
        .pop()
        .ok_or_else(|| CorpusError::Embedding("embedder returned no vector".into()))
}
