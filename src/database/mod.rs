// Database module
// Vector storage for book descriptions and corpus chunks

pub mod lancedb;

pub use lancedb::{ChunkMetadata, EmbeddingRecord};
pub use lancedb::vector_store::{SearchResult, VectorStore};
