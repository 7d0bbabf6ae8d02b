//! Offline ingestion: walk a directory of `.txt`, `.md` and `.pdf` files into a corpus.
//!
//! Sources are recorded relative to the ingested directory, so the same tree
//! reached through another path spelling maps onto the same chunk ids. Each
//! file's previous chunks are removed before its new ones are stored.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::chunker::{Chunk, ChunkerConfig, TextChunker};
use super::{ChunkMetadata, ChunkRecord, CorpusError, CorpusIndex};
use crate::graph::CallPolicy;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];
const PDF_EXTENSION: &str = "pdf";

/// Chunks embedded per embedder call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// What an ingestion pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    /// Chunks from earlier ingestions that were replaced or dropped.
    pub removed: usize,
    /// Matching files that could not be read or parsed.
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Text,
    Pdf,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?;
    if TEXT_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(ext)) {
        Some(FileKind::Text)
    } else if ext.eq_ignore_ascii_case(PDF_EXTENSION) {
        Some(FileKind::Pdf)
    } else {
        None
    }
}

/// `path` relative to `root`, `/`-separated. Falls back to the file name.
fn relative_source(root: &Path, path: &Path) -> String {
    let parts: Vec<String> = match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    if parts.is_empty() {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    } else {
        parts.join("/")
    }
}

/// Text of every page of a PDF, page 1 first.
async fn read_pdf_pages(path: &Path) -> Result<Vec<String>, String> {
    let path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&path)).await {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("pdf extraction aborted: {}", e)),
    }
}

/// Walks directories into a [`CorpusIndex`].
///
/// Embedding runs in batches of `batch_size` chunks, each batch under the
/// ingestor's [`CallPolicy`].
#[derive(Debug, Clone)]
pub struct Ingestor {
    chunker: TextChunker,
    policy: CallPolicy,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(config: ChunkerConfig) -> Self {
        Self {
            chunker: TextChunker::new(config),
            policy: CallPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Batch size of 0 is treated as 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Chunks of one file, or `None` when the file must be skipped.
    async fn read_chunks(&self, path: &Path, kind: FileKind) -> Option<Vec<Chunk>> {
        match kind {
            FileKind::Text => match tokio::fs::read_to_string(path).await {
                Ok(text) => Some(self.chunker.split_document(&text)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    None
                }
            },
            FileKind::Pdf => match read_pdf_pages(path).await {
                Ok(pages) => Some(self.chunker.split_pages(pages.iter().map(String::as_str))),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparsable pdf");
                    None
                }
            },
        }
    }

    /// Chunks every matching file under `dir` into `corpus`.
    ///
    /// Files are visited in sorted order. Chunk ids are derived from
    /// (relative path, page, offset), and a file's old chunks are removed
    /// first, so re-ingesting never duplicates or leaves stale chunks.
    pub async fn ingest_dir(
        &self,
        corpus: &dyn CorpusIndex,
        dir: &Path,
    ) -> Result<IngestReport, CorpusError> {
        if !dir.is_dir() {
            return Err(CorpusError::Storage(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        let mut report = IngestReport::default();

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| CorpusError::Storage(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(kind) = file_kind(entry.path()) {
                files.push((entry.into_path(), kind));
            }
        }

        for (path, kind) in files {
            let Some(chunks) = self.read_chunks(&path, kind).await else {
                report.skipped.push(path);
                continue;
            };
            let source = relative_source(dir, &path);
            let records: Vec<ChunkRecord> = chunks
                .into_iter()
                .map(|c| {
                    let metadata = ChunkMetadata::new(source.clone(), c.page, c.start_offset);
                    ChunkRecord::new(c.text, metadata)
                })
                .collect();

            report.removed += corpus.remove_source(&source).await?;
            tracing::debug!(source = %source, chunks = records.len(), "ingesting file");
            for batch in records.chunks(self.batch_size) {
                self.policy
                    .call("embed_batch", || corpus.add_chunks(batch))
                    .await?;
                report.chunks += batch.len();
            }
            report.files += 1;
        }

        tracing::info!(
            files = report.files,
            chunks = report.chunks,
            removed = report.removed,
            skipped = report.skipped.len(),
            "ingestion complete"
        );
        Ok(report)
    }
}

/// [`Ingestor::ingest_dir`] with the default call policy and batch size.
pub async fn ingest_dir(
    corpus: &dyn CorpusIndex,
    dir: &Path,
    config: ChunkerConfig,
) -> Result<IngestReport, CorpusError> {
    Ingestor::new(config).ingest_dir(corpus, dir).await
}
