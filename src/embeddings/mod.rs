// Embeddings module
// Handles Ollama integration and content chunking

pub mod chunking;
pub mod ollama;

pub use chunking::{
    ChunkingConfig, DocumentChunk, chunk_document, estimate_token_count, split_tagged_lines,
};
pub use ollama::{EmbeddingResult, OllamaClient};

use anyhow::Result;

/// Seam between the pipelines and the embedding backend.
///
/// Production code uses [`OllamaClient`]; tests substitute a deterministic
/// in-process implementation.
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of texts, in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
