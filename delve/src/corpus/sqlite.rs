//! Persistent corpus on SQLite with sqlite-vec KNN retrieval.
//!
//! Two tables: `corpus_chunks` holds text and provenance, the `vec0` virtual
//! table `corpus_embeddings` holds one embedding per chunk under the same rowid.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Transaction};

use super::{
    embed_batch, embed_one, ChunkMetadata, ChunkRecord, CorpusError, CorpusIndex, Embedder,
    RetrievedChunk,
};

static SQLITE_VEC_INIT: Once = Once::new();

fn storage_err(e: impl std::fmt::Display) -> CorpusError {
    CorpusError::Storage(e.to_string())
}

/// Formats a vector as JSON for sqlite-vec (e.g. "[0.1,0.2,0.3]").
fn vector_to_json(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|f| f.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Inserts or replaces one chunk and its embedding, keyed by chunk id.
fn upsert_chunk(
    tx: &Transaction<'_>,
    chunk: &ChunkRecord,
    vec_json: &str,
) -> Result<(), CorpusError> {
    let metadata = &chunk.metadata;
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM corpus_chunks WHERE chunk_id = ?1",
            params![chunk.id],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage_err)?;

    let rowid = match existing {
        Some(rowid) => {
            tx.execute("DELETE FROM corpus_embeddings WHERE rowid = ?1", params![rowid])
                .map_err(storage_err)?;
            tx.execute(
                "UPDATE corpus_chunks SET text = ?1, source = ?2, page = ?3, start_offset = ?4 WHERE id = ?5",
                params![
                    chunk.text,
                    metadata.source,
                    metadata.page,
                    metadata.start_offset as i64,
                    rowid
                ],
            )
            .map_err(storage_err)?;
            rowid
        }
        None => {
            tx.execute(
                "INSERT INTO corpus_chunks (chunk_id, text, source, page, start_offset) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    chunk.id,
                    chunk.text,
                    metadata.source,
                    metadata.page,
                    metadata.start_offset as i64
                ],
            )
            .map_err(storage_err)?;
            tx.last_insert_rowid()
        }
    };

    tx.execute(
        "INSERT INTO corpus_embeddings (rowid, embedding) VALUES (?1, ?2)",
        params![rowid, vec_json],
    )
    .map_err(storage_err)?;
    Ok(())
}

/// SQLite-backed corpus. Each operation opens its own connection on a blocking thread.
pub struct SqliteCorpus {
    db_path: PathBuf,
    embedder: Arc<dyn Embedder>,
    dimension: usize,
}

impl SqliteCorpus {
    /// Opens (or creates) the corpus at `path`. Registers sqlite-vec once per process.
    ///
    /// The embedding table is sized from `embedder.dimension()`; reopening a
    /// file with an embedder of another dimension fails on first insert or query.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self, CorpusError> {
        SQLITE_VEC_INIT.call_once(|| unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        });

        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(storage_err)?;
            }
        }
        let dimension = embedder.dimension();

        let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS corpus_chunks (
                id INTEGER PRIMARY KEY,
                chunk_id TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                source TEXT NOT NULL,
                page INTEGER NOT NULL,
                start_offset INTEGER NOT NULL
            )
            "#,
            [],
        )
        .map_err(storage_err)?;
        conn.execute(
            &format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS corpus_embeddings USING vec0(embedding float[{}])",
                dimension
            ),
            [],
        )
        .map_err(storage_err)?;

        Ok(Self {
            db_path,
            embedder,
            dimension,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl CorpusIndex for SqliteCorpus {
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

    /// Embeds the batch in one call, then upserts every chunk in one transaction.
    async fn add_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), CorpusError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = embed_batch(self.embedder.as_ref(), &texts).await?;
        let rows: Vec<(ChunkRecord, String)> = chunks
            .iter()
            .cloned()
            .zip(vectors.iter().map(|v| vector_to_json(v)))
            .collect();
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
            let tx = conn.transaction().map_err(storage_err)?;
            for (chunk, vec_json) in &rows {
                upsert_chunk(&tx, chunk, vec_json)?;
            }
            tx.commit().map_err(storage_err)?;
            Ok::<(), CorpusError>(())
        })
        .await
        .map_err(storage_err)?
    }

    async fn remove_source(&self, source: &str) -> Result<usize, CorpusError> {
        let db_path = self.db_path.clone();
        let source = source.to_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
            let tx = conn.transaction().map_err(storage_err)?;
            let rowids: Vec<i64> = {
                let mut stmt = tx
                    .prepare("SELECT id FROM corpus_chunks WHERE source = ?1")
                    .map_err(storage_err)?;
                let ids = stmt
                    .query_map(params![source], |row| row.get(0))
                    .map_err(storage_err)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(storage_err)?;
                ids
            };
            for rowid in &rowids {
                tx.execute("DELETE FROM corpus_embeddings WHERE rowid = ?1", params![rowid])
                    .map_err(storage_err)?;
            }
            tx.execute("DELETE FROM corpus_chunks WHERE source = ?1", params![source])
                .map_err(storage_err)?;
            tx.commit().map_err(storage_err)?;
            Ok::<usize, CorpusError>(rowids.len())
        })
        .await
        .map_err(storage_err)?
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, CorpusError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = embed_one(self.embedder.as_ref(), query).await?;
        let vec_json = vector_to_json(&query_vec);
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;

            let mut stmt = conn
                .prepare("SELECT rowid, distance FROM corpus_embeddings WHERE embedding MATCH ?1 AND k = ?2")
                .map_err(storage_err)?;
            let rowids_with_dist: Vec<(i64, f64)> = stmt
                .query_map(params![vec_json, k as i64], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
                })
                .map_err(storage_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err)?;

            if rowids_with_dist.is_empty() {
                return Ok(Vec::new());
            }

            let dist_map: HashMap<i64, f64> = rowids_with_dist.iter().copied().collect();
            let placeholders: String = rowids_with_dist
                .iter()
                .map(|_| "?")
                .collect::<Vec<_>>()
                .join(",");
            let meta_sql = format!(
                "SELECT id, text, source, page, start_offset FROM corpus_chunks WHERE id IN ({})",
                placeholders
            );
            let mut stmt = conn.prepare(&meta_sql).map_err(storage_err)?;
            let rows = stmt
                .query_map(
                    rusqlite::params_from_iter(rowids_with_dist.iter().map(|(id, _)| *id)),
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, u32>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    },
                )
                .map_err(storage_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage_err)?;

            let mut hits: Vec<RetrievedChunk> = rows
                .into_iter()
                .filter_map(|(id, text, source, page, start_offset)| {
                    let dist = dist_map.get(&id).copied()?;
                    Some(RetrievedChunk {
                        text,
                        metadata: ChunkMetadata::new(source, page, start_offset.max(0) as usize),
                        score: (1.0 / (1.0 + dist)) as f32,
                    })
                })
                .collect();

            hits.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            hits.truncate(k);
            Ok::<Vec<RetrievedChunk>, CorpusError>(hits)
        })
        .await
        .map_err(storage_err)?
    }

    async fn len(&self) -> Result<usize, CorpusError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
            let n: i64 = conn
                .query_row("SELECT COUNT(*) FROM corpus_chunks", [], |row| row.get(0))
                .map_err(storage_err)?;
            Ok::<usize, CorpusError>(n.max(0) as usize)
        })
        .await
        .map_err(storage_err)?
    }
}
