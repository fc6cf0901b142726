use super::*;
use crate::database::VectorStore;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Deterministic embedder for tests. Counts calls so idempotence tests can
/// assert nothing was re-embedded.
pub struct StubEmbedder {
    pub calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn embed_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(text: &str) -> Vec<f32> {
        // Spread texts around a small space based on simple byte stats
        let bytes = text.as_bytes();
        let sum: u32 = bytes.iter().map(|&b| u32::from(b)).sum();
        let len = bytes.len() as f32;
        vec![
            (sum % 97) as f32 / 97.0,
            (sum % 31) as f32 / 31.0,
            len / 1000.0,
            bytes.first().copied().unwrap_or(0) as f32 / 255.0,
            bytes.last().copied().unwrap_or(0) as f32 / 255.0,
        ]
    }
}

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector_for(text))
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.library.tagged_descriptions = temp_dir.path().join("tagged_description.txt");
    config.library.corpus_dir = temp_dir.path().join("corpus");
    config
}

fn write_seed_file(config: &Config) {
    fs::write(
        &config.library.tagged_descriptions,
        "\"9780002005883\": A novel about forgiveness.\n\"9780002261982\": A spy thriller.\n",
    )
    .expect("seed file written");
}

#[tokio::test]
async fn bootstrap_seeds_empty_collection() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&temp_dir);
    write_seed_file(&config);

    let mut store = VectorStore::open(&config, "books").await.expect("store");
    let embedder = StubEmbedder::new();

    let outcome = bootstrap_books(&config, &mut store, &embedder)
        .await
        .expect("bootstrap succeeds");

    assert_eq!(outcome, IngestOutcome::Seeded { chunks: 2 });
    assert_eq!(store.count_embeddings().await.expect("count"), 2);
}

#[tokio::test]
async fn bootstrap_is_idempotent() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&temp_dir);
    write_seed_file(&config);

    let mut store = VectorStore::open(&config, "books").await.expect("store");
    let embedder = StubEmbedder::new();

    bootstrap_books(&config, &mut store, &embedder)
        .await
        .expect("first bootstrap succeeds");
    let calls_after_first = embedder.embed_calls();

    let outcome = bootstrap_books(&config, &mut store, &embedder)
        .await
        .expect("second bootstrap succeeds");

    assert_eq!(outcome, IngestOutcome::AlreadyPopulated { existing: 2 });
    assert_eq!(embedder.embed_calls(), calls_after_first);
    assert_eq!(store.count_embeddings().await.expect("count"), 2);
}

#[tokio::test]
async fn bootstrap_without_seed_file_fails() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&temp_dir);

    let mut store = VectorStore::open(&config, "books").await.expect("store");
    let embedder = StubEmbedder::new();

    let result = bootstrap_books(&config, &mut store, &embedder).await;
    assert!(matches!(result, Err(crate::ShelfError::Config(_))));
}

#[tokio::test]
async fn corpus_ingestion_walks_directory() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&temp_dir);

    fs::create_dir_all(config.library.corpus_dir.join("nested")).expect("corpus dirs");
    fs::write(
        config.library.corpus_dir.join("login.txt"),
        "Verify the login form rejects empty passwords.",
    )
    .expect("txt written");
    fs::write(
        config.library.corpus_dir.join("nested/cart.md"),
        "Check the cart total updates when an item is removed.",
    )
    .expect("md written");
    fs::write(
        config.library.corpus_dir.join("ignored.pdf"),
        "binary-ish content",
    )
    .expect("pdf written");

    let mut store = VectorStore::open(&config, "corpus").await.expect("store");
    let embedder = StubEmbedder::new();

    let outcome = ingest_corpus(&config, &mut store, &embedder)
        .await
        .expect("ingestion succeeds");

    assert_eq!(outcome, IngestOutcome::Seeded { chunks: 2 });

    let results = store
        .search_similar(&StubEmbedder::vector_for("Verify the login form rejects empty passwords."), 1)
        .await
        .expect("search succeeds");
    assert_eq!(results.len(), 1);
    assert!(results[0].chunk_metadata.source_file.ends_with("login.txt"));
}

#[tokio::test]
async fn corpus_ingestion_skips_populated_collection() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&temp_dir);

    fs::create_dir_all(&config.library.corpus_dir).expect("corpus dir");
    fs::write(
        config.library.corpus_dir.join("cases.txt"),
        "Verify the checkout flow handles declined cards.",
    )
    .expect("txt written");

    let mut store = VectorStore::open(&config, "corpus").await.expect("store");
    let embedder = StubEmbedder::new();

    ingest_corpus(&config, &mut store, &embedder)
        .await
        .expect("first run succeeds");
    let outcome = ingest_corpus(&config, &mut store, &embedder)
        .await
        .expect("second run succeeds");

    assert_eq!(outcome, IngestOutcome::AlreadyPopulated { existing: 1 });
}

#[tokio::test]
async fn corpus_ingestion_of_empty_directory() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&temp_dir);
    fs::create_dir_all(&config.library.corpus_dir).expect("corpus dir");

    let mut store = VectorStore::open(&config, "corpus").await.expect("store");
    let embedder = StubEmbedder::new();

    let outcome = ingest_corpus(&config, &mut store, &embedder)
        .await
        .expect("ingestion succeeds");
    assert_eq!(outcome, IngestOutcome::Seeded { chunks: 0 });
}

#[tokio::test]
async fn missing_corpus_directory_fails() {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config(&temp_dir);

    let mut store = VectorStore::open(&config, "corpus").await.expect("store");
    let embedder = StubEmbedder::new();

    let result = ingest_corpus(&config, &mut store, &embedder).await;
    assert!(matches!(result, Err(crate::ShelfError::Config(_))));
}
