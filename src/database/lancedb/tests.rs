use super::*;
use crate::embeddings::DocumentChunk;

#[test]
fn record_from_chunk() {
    let chunk = DocumentChunk {
        content: "Verify the password reset email arrives within a minute.".to_string(),
        source_file: "corpus/reset.md".to_string(),
        chunk_index: 3,
        token_count: 12,
    };

    let record = EmbeddingRecord::from_chunk(&chunk, vec![0.1, 0.2, 0.3]);

    assert_eq!(record.vector, vec![0.1, 0.2, 0.3]);
    assert_eq!(record.metadata.chunk_id, "corpus/reset.md#3");
    assert_eq!(record.metadata.source_file, "corpus/reset.md");
    assert_eq!(record.metadata.content, chunk.content);
    assert_eq!(record.metadata.token_count, 12);
    assert_eq!(record.metadata.chunk_index, 3);
    assert!(!record.id.is_empty());
    assert!(!record.metadata.created_at.is_empty());
}

#[test]
fn record_ids_are_unique() {
    let chunk = DocumentChunk {
        content: "text".to_string(),
        source_file: "a.txt".to_string(),
        chunk_index: 0,
        token_count: 1,
    };

    let first = EmbeddingRecord::from_chunk(&chunk, vec![0.0]);
    let second = EmbeddingRecord::from_chunk(&chunk, vec![0.0]);
    assert_ne!(first.id, second.id);
}
