// Ingestion module
// Seeds the book collection and the test-case corpus into the vector store

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::database::{EmbeddingRecord, VectorStore};
use crate::embeddings::{DocumentChunk, Embedder, chunk_document, split_tagged_lines};
use crate::{Result, ShelfError};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The collection already held embeddings; nothing was re-embedded.
    AlreadyPopulated { existing: u64 },
    /// The collection was empty and has been seeded.
    Seeded { chunks: u64 },
}

impl IngestOutcome {
    #[inline]
    pub fn chunk_count(self) -> u64 {
        match self {
            IngestOutcome::AlreadyPopulated { existing } => existing,
            IngestOutcome::Seeded { chunks } => chunks,
        }
    }
}

/// Seed the `books` collection from the tagged-descriptions file.
///
/// Each non-empty line becomes one embedded chunk whose content starts with
/// the book's isbn13. A non-empty collection is reused as-is; an empty
/// collection with no seed file is a configuration error.
#[inline]
pub async fn bootstrap_books(
    config: &Config,
    store: &mut VectorStore,
    embedder: &dyn Embedder,
) -> Result<IngestOutcome> {
    let existing = store.count_embeddings().await?;
    if existing > 0 {
        info!(
            "Books collection already holds {} embeddings, skipping seed",
            existing
        );
        return Ok(IngestOutcome::AlreadyPopulated { existing });
    }

    let seed_path = &config.library.tagged_descriptions;
    if !seed_path.exists() {
        return Err(ShelfError::Config(format!(
            "Books collection is empty and seed file {} does not exist",
            seed_path.display()
        )));
    }

    let text = std::fs::read_to_string(seed_path)?;
    let source_file = seed_path.display().to_string();
    let chunks = split_tagged_lines(&text, &source_file);

    if chunks.is_empty() {
        return Err(ShelfError::Config(format!(
            "Seed file {} contains no descriptions",
            seed_path.display()
        )));
    }

    info!(
        "Seeding books collection with {} tagged descriptions",
        chunks.len()
    );
    let stored = embed_and_store(config, store, embedder, chunks).await?;

    Ok(IngestOutcome::Seeded { chunks: stored })
}

/// Ingest the test-case corpus directory into the `corpus` collection.
///
/// Walks the corpus directory for `.txt` and `.md` files, splits each one
/// with the length-based chunker, and embeds the result. A collection that
/// already holds embeddings is left untouched.
#[inline]
pub async fn ingest_corpus(
    config: &Config,
    store: &mut VectorStore,
    embedder: &dyn Embedder,
) -> Result<IngestOutcome> {
    let existing = store.count_embeddings().await?;
    if existing > 0 {
        info!(
            "Corpus collection already holds {} embeddings, skipping ingestion",
            existing
        );
        return Ok(IngestOutcome::AlreadyPopulated { existing });
    }

    let corpus_dir = &config.library.corpus_dir;
    if !corpus_dir.is_dir() {
        return Err(ShelfError::Config(format!(
            "Corpus directory {} does not exist",
            corpus_dir.display()
        )));
    }

    let mut chunks = Vec::new();
    for entry in WalkDir::new(corpus_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            ShelfError::Ingest(format!("Failed to walk {}: {}", corpus_dir.display(), e))
        })?;

        if !entry.file_type().is_file() || !is_corpus_file(entry.path()) {
            continue;
        }

        let path = entry.path();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", path.display(), e);
                continue;
            }
        };

        let source_file = path.display().to_string();
        let file_chunks = chunk_document(&text, &source_file, &config.chunking)?;
        debug!("{} produced {} chunks", source_file, file_chunks.len());
        chunks.extend(file_chunks);
    }

    if chunks.is_empty() {
        warn!(
            "No ingestible documents found under {}",
            corpus_dir.display()
        );
        return Ok(IngestOutcome::Seeded { chunks: 0 });
    }

    info!("Ingesting {} corpus chunks", chunks.len());
    let stored = embed_and_store(config, store, embedder, chunks).await?;

    Ok(IngestOutcome::Seeded { chunks: stored })
}

fn is_corpus_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("txt" | "md")
    )
}

/// Embed chunks batch-by-batch and insert them into the store.
async fn embed_and_store(
    config: &Config,
    store: &mut VectorStore,
    embedder: &dyn Embedder,
    chunks: Vec<DocumentChunk>,
) -> Result<u64> {
    let progress = ProgressBar::new(chunks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} chunks embedded")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut stored = 0u64;
    for batch in chunks.chunks(config.ollama.batch_size as usize) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .map_err(|e| ShelfError::Embedding(format!("Failed to embed batch: {}", e)))?;

        if vectors.len() != batch.len() {
            return Err(ShelfError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            )));
        }

        let records: Vec<EmbeddingRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord::from_chunk(chunk, vector))
            .collect();

        store.store_embeddings_batch(records).await?;
        stored += batch.len() as u64;
        progress.inc(batch.len() as u64);
    }

    progress.finish_and_clear();
    Ok(stored)
}
