//! In-memory corpus with cosine-similarity retrieval. Not persistent.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    embed_batch, embed_one, ChunkMetadata, ChunkRecord, CorpusError, CorpusIndex, Embedder,
    RetrievedChunk,
};

#[derive(Clone)]
struct ChunkEntry {
    text: String,
    metadata: ChunkMetadata,
    vector: Vec<f32>,
}

/// Corpus kept in a `DashMap`, keyed by chunk id.
pub struct InMemoryCorpus {
    data: DashMap<String, ChunkEntry>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryCorpus {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            data: DashMap::new(),
            embedder,
        }
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot_product / (norm_a * norm_b)
        }
    }
}

#[async_trait]
impl CorpusIndex for InMemoryCorpus {
    async fn add_chunk(
        &self,
        id: &str,
        text: &str,
        metadata: &ChunkMetadata,
    ) -> Result<(), CorpusError> {
        self.add_chunks(&[ChunkRecord {
            id: id.to_string(),
            text: text.to_string(),
            metadata: metadata.clone(),
        }])
        .await
    }

    async fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), CorpusError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = embed_batch(self.embedder.as_ref(), &texts).await?;
        for (chunk, vector) in chunks.iter().zip(vectors) {
            self.data.insert(
                chunk.id.clone(),
                ChunkEntry {
                    text: chunk.text.clone(),
                    metadata: chunk.metadata.clone(),
                    vector,
                },
            );
        }
        Ok(())
    }

    async fn remove_source(&self, source: &str) -> Result<usize, CorpusError> {
        let before = self.data.len();
        self.data.retain(|_, entry| entry.metadata.source != source);
        Ok(before - self.data.len())
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, CorpusError> {
        if k == 0 || self.data.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = embed_one(self.embedder.as_ref(), query).await?;

        let mut hits: Vec<RetrievedChunk> = self
            .data
            .iter()
            .map(|entry| RetrievedChunk {
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                score: Self::cosine_similarity(&query_vec, &entry.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn len(&self) -> Result<usize, CorpusError> {
        Ok(self.data.len())
    }
}
