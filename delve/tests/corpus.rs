//! SqliteCorpus persistence and directory ingestion.

mod init_logging;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use delve::{
    ingest_dir, CallPolicy, ChunkMetadata, ChunkerConfig, CorpusError, CorpusIndex, Embedder,
    InMemoryCorpus, Ingestor, RetryPolicy, SqliteCorpus,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Embeds text by counting a handful of marker words.
struct KeywordEmbedder;

const KEYWORDS: [&str; 4] = ["rust", "python", "sqlite", "vector"];

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CorpusError> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let mut v: Vec<f32> = KEYWORDS
                    .iter()
                    .map(|k| lower.matches(k).count() as f32)
                    .collect();
                // keep every vector non-zero
                v.push(0.1);
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        KEYWORDS.len() + 1
    }
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(KeywordEmbedder)
}

async fn add(corpus: &dyn CorpusIndex, source: &str, page: u32, text: &str) {
    let meta = ChunkMetadata::new(source, page, 0);
    corpus.add_chunk(&meta.chunk_id(), text, &meta).await.unwrap();
}

/// **Scenario**: open creates the file and its parent directory; an empty corpus retrieves nothing.
#[tokio::test]
async fn open_creates_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("delve.db");
    let corpus = SqliteCorpus::open(&path, embedder()).unwrap();

    assert!(path.exists());
    assert_eq!(corpus.path(), path.as_path());
    assert_eq!(corpus.dimension(), 5);
    assert!(corpus.is_empty().await.unwrap());
    assert!(corpus.retrieve("rust", 3).await.unwrap().is_empty());
}

/// **Scenario**: nearest chunks come back first with provenance, truncated to k.
#[tokio::test]
async fn retrieve_ranks_by_similarity() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = SqliteCorpus::open(dir.path().join("c.db"), embedder()).unwrap();
    add(&corpus, "rust.md", 1, "Rust ownership and borrowing").await;
    add(&corpus, "python.md", 3, "Python python scripting").await;
    add(&corpus, "db.md", 2, "SQLite vector search").await;

    let hits = corpus.retrieve("rust", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].text, "Rust ownership and borrowing");
    assert_eq!(hits[0].metadata.citation(), "rust.md, p. 1");
    assert!(hits[0].score >= hits[1].score);

    assert!(corpus.retrieve("rust", 0).await.unwrap().is_empty());
}

/// **Scenario**: re-adding a chunk id replaces its text instead of duplicating it.
#[tokio::test]
async fn add_chunk_upserts_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = SqliteCorpus::open(dir.path().join("c.db"), embedder()).unwrap();
    add(&corpus, "a.md", 1, "old python text").await;
    add(&corpus, "a.md", 1, "new rust text").await;

    assert_eq!(corpus.len().await.unwrap(), 1);
    let hits = corpus.retrieve("rust", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "new rust text");
}

/// **Scenario**: chunks survive closing and reopening the store.
#[tokio::test]
async fn persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.db");
    {
        let corpus = SqliteCorpus::open(&path, embedder()).unwrap();
        add(&corpus, "v.md", 4, "vector vector index").await;
    }
    let reopened = SqliteCorpus::open(&path, embedder()).unwrap();
    assert_eq!(reopened.len().await.unwrap(), 1);
    let hits = reopened.retrieve("vector", 1).await.unwrap();
    assert_eq!(hits[0].metadata.page, 4);
}

/// **Scenario**: an embedder returning the wrong width is rejected before storage.
#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    struct Short;
    #[async_trait]
    impl Embedder for Short {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CorpusError> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
        fn dimension(&self) -> usize {
            3
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let corpus = SqliteCorpus::open(dir.path().join("c.db"), Arc::new(Short)).unwrap();
    let meta = ChunkMetadata::new("x", 1, 0);
    let err = corpus.add_chunk("x#p1@0", "text", &meta).await.unwrap_err();
    assert!(matches!(err, CorpusError::Dimension { expected: 3, actual: 1 }));
}

/// Writes a PDF with one page per entry of `pages`, each holding one line of text.
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// **Scenario**: ingesting a directory picks up .txt/.md files, splits pages on form feeds,
/// skips a file that only claims to be a PDF, and re-ingesting leaves the chunk count unchanged.
#[tokio::test]
async fn ingest_dir_is_idempotent() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("a.txt"), "Rust page one.\u{000C}Rust page two.").unwrap();
    std::fs::create_dir(docs.path().join("sub")).unwrap();
    std::fs::write(docs.path().join("sub").join("b.md"), "Python notes.").unwrap();
    std::fs::write(docs.path().join("c.pdf"), "not a pdf").unwrap();

    let store = tempfile::tempdir().unwrap();
    let corpus = SqliteCorpus::open(store.path().join("c.db"), embedder()).unwrap();
    let config = ChunkerConfig::default();

    let first = ingest_dir(&corpus, docs.path(), config).await.unwrap();
    assert_eq!(first.files, 2);
    assert_eq!(first.chunks, 3);
    assert_eq!(first.skipped, vec![docs.path().join("c.pdf")]);
    assert_eq!(first.removed, 0);
    assert_eq!(corpus.len().await.unwrap(), 3);

    let second = ingest_dir(&corpus, docs.path(), config).await.unwrap();
    assert_eq!(second.chunks, 3);
    assert_eq!(second.removed, 3);
    assert_eq!(corpus.len().await.unwrap(), 3);

    let hits = corpus.retrieve("rust", 2).await.unwrap();
    let mut pages: Vec<u32> = hits.iter().map(|h| h.metadata.page).collect();
    pages.sort();
    assert_eq!(pages, vec![1, 2]);
    assert!(hits.iter().all(|h| h.metadata.source == "a.txt"));
}

/// **Scenario**: the same directory reached through another path spelling maps onto the
/// same chunks, and a file that shrinks or empties leaves no stale chunks behind.
#[tokio::test]
async fn reingest_replaces_chunks_by_relative_source() {
    let docs = tempfile::tempdir().unwrap();
    let a = docs.path().join("a.txt");
    std::fs::write(&a, "Rust page one.\u{000C}Rust page two.").unwrap();
    std::fs::create_dir(docs.path().join("sub")).unwrap();
    std::fs::write(docs.path().join("sub").join("b.md"), "Python notes.").unwrap();

    let store = tempfile::tempdir().unwrap();
    let corpus = SqliteCorpus::open(store.path().join("c.db"), embedder()).unwrap();
    let config = ChunkerConfig::default();

    ingest_dir(&corpus, docs.path(), config).await.unwrap();
    assert_eq!(corpus.len().await.unwrap(), 3);

    let alias = docs.path().join("sub").join("..");
    let again = ingest_dir(&corpus, &alias, config).await.unwrap();
    assert_eq!(again.removed, 3);
    assert_eq!(corpus.len().await.unwrap(), 3);
    let mut citations: Vec<String> = corpus
        .retrieve("rust", 5)
        .await
        .unwrap()
        .iter()
        .map(|h| h.metadata.citation())
        .collect();
    citations.sort();
    assert_eq!(citations, vec!["a.txt, p. 1", "a.txt, p. 2", "sub/b.md, p. 1"]);

    std::fs::write(&a, "Rust only page.").unwrap();
    let shrunk = ingest_dir(&corpus, docs.path(), config).await.unwrap();
    assert_eq!(shrunk.removed, 3);
    assert_eq!(corpus.len().await.unwrap(), 2);
    let hits = corpus.retrieve("rust", 5).await.unwrap();
    assert!(hits.iter().all(|h| h.metadata.page == 1), "{:?}", hits);
    assert!(hits.iter().any(|h| h.text == "Rust only page."));

    std::fs::write(&a, "").unwrap();
    ingest_dir(&corpus, docs.path(), config).await.unwrap();
    assert_eq!(corpus.len().await.unwrap(), 1);
    let hits = corpus.retrieve("rust", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata.source, "sub/b.md");
}

/// **Scenario**: each PDF page becomes its own chunk tagged with its real page number.
#[tokio::test]
async fn pdf_pages_keep_their_numbers() {
    let docs = tempfile::tempdir().unwrap();
    write_pdf(
        &docs.path().join("paper.pdf"),
        &["Rust ownership rules", "Vector search with SQLite"],
    );

    let corpus = InMemoryCorpus::new(embedder());
    let report = ingest_dir(&corpus, docs.path(), ChunkerConfig::default())
        .await
        .unwrap();
    assert_eq!(report.files, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(report.chunks, 2);

    let rust = corpus.retrieve("rust", 1).await.unwrap();
    assert_eq!(rust[0].metadata.citation(), "paper.pdf, p. 1");
    assert!(rust[0].text.to_lowercase().contains("ownership"), "{:?}", rust[0].text);

    let vector = corpus.retrieve("sqlite vector", 1).await.unwrap();
    assert_eq!(vector[0].metadata.citation(), "paper.pdf, p. 2");
    assert!(vector[0].text.to_lowercase().contains("search"), "{:?}", vector[0].text);
}

/// Fails its first call with a rate limit, then embeds like [`KeywordEmbedder`].
struct RateLimitedOnce {
    calls: AtomicUsize,
    batches: Mutex<Vec<usize>>,
}

#[async_trait]
impl Embedder for RateLimitedOnce {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CorpusError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(CorpusError::Embedding("429 rate limited".into()));
        }
        self.batches.lock().unwrap().push(texts.len());
        KeywordEmbedder.embed(texts).await
    }

    fn dimension(&self) -> usize {
        KeywordEmbedder.dimension()
    }
}

/// **Scenario**: ingestion embeds in batches and retries a batch that hit a rate limit.
#[tokio::test]
async fn ingest_batches_and_retries_embedding() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(
        docs.path().join("a.txt"),
        "Rust one.\u{000C}Rust two.\u{000C}Rust three.",
    )
    .unwrap();

    let flaky = Arc::new(RateLimitedOnce {
        calls: AtomicUsize::new(0),
        batches: Mutex::new(Vec::new()),
    });
    let corpus = InMemoryCorpus::new(flaky.clone());
    let ingestor = Ingestor::new(ChunkerConfig::default())
        .with_policy(CallPolicy::new(
            RetryPolicy::fixed(1, Duration::ZERO),
            Duration::from_secs(5),
        ))
        .with_batch_size(2);

    let report = ingestor.ingest_dir(&corpus, docs.path()).await.unwrap();
    assert_eq!(report.chunks, 3);
    assert_eq!(corpus.len().await.unwrap(), 3);
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    assert_eq!(*flaky.batches.lock().unwrap(), vec![2, 1]);
}

/// **Scenario**: ingest works against any CorpusIndex and rejects a missing directory.
#[tokio::test]
async fn ingest_into_memory_and_missing_dir() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("n.md"), "SQLite notes").unwrap();
    let corpus = InMemoryCorpus::new(embedder());

    let report = ingest_dir(&corpus, docs.path(), ChunkerConfig::default())
        .await
        .unwrap();
    assert_eq!(report.chunks, 1);
    assert_eq!(corpus.len().await.unwrap(), 1);

    let err = ingest_dir(&corpus, &docs.path().join("missing"), ChunkerConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CorpusError::Storage(_)));
}
