// LanceDB vector database module
// Handles vector storage and similarity search for embeddings

#[cfg(test)]
mod tests;

pub mod vector_store;

use serde::{Deserialize, Serialize};

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding (768 dimensions for nomic-embed-text)
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Stable identifier for the chunk within its source file
    pub chunk_id: String,
    /// Path of the file the chunk was produced from
    pub source_file: String,
    /// The actual text content of the chunk
    pub content: String,
    /// Token count of the chunk
    pub token_count: u32,
    /// Index of this chunk within the source file (for ordering)
    pub chunk_index: u32,
    /// Timestamp when this embedding was created
    pub created_at: String,
}

impl EmbeddingRecord {
    /// Build a record from a chunk and its embedding vector.
    #[inline]
    pub fn from_chunk(
        chunk: &crate::embeddings::DocumentChunk,
        vector: Vec<f32>,
    ) -> Self {
        let chunk_id = format!("{}#{}", chunk.source_file, chunk.chunk_index);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            metadata: ChunkMetadata {
                chunk_id,
                source_file: chunk.source_file.clone(),
                content: chunk.content.clone(),
                token_count: u32::try_from(chunk.token_count).unwrap_or(u32::MAX),
                chunk_index: u32::try_from(chunk.chunk_index).unwrap_or(u32::MAX),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}
