
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A chunk of source text ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// The chunk text
    pub content: String,
    /// File the chunk was produced from
    pub source_file: String,
    /// Index of this chunk within its source file
    pub chunk_index: usize,
    /// Estimated token count
    pub token_count: usize,
}

/// Configuration for the recursive length-based splitter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens
    pub target_chunk_size: usize,
    /// Maximum chunk size in tokens before forced splitting
    pub max_chunk_size: usize,
    /// Minimum chunk size in tokens (smaller chunks are merged into a neighbor)
    pub min_chunk_size: usize,
    /// Overlap in tokens carried from the tail of the previous chunk
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            target_chunk_size: 250,
            max_chunk_size: 500,
            min_chunk_size: 20,
            overlap_size: 10,
        }
    }
}

/// Split one source file's text into embedding-ready chunks.
///
/// Splits by paragraph first, falling back to sentences and then words for
/// oversized paragraphs. Undersized chunks are merged into their predecessor
/// and adjacent chunks receive a small token overlap.
#[inline]
pub fn chunk_document(
    text: &str,
    source_file: &str,
    config: &ChunkingConfig,
) -> Result<Vec<DocumentChunk>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let token_count = estimate_token_count(text);

    // Small documents stay whole
    let splits = if token_count <= config.target_chunk_size {
        vec![text.trim().to_string()]
    } else {
        split_by_paragraphs(text, config)
    };

    let mut chunks: Vec<DocumentChunk> = splits
        .into_iter()
        .filter(|split| !split.trim().is_empty())
        .map(|split| {
            let token_count = estimate_token_count(&split);
            DocumentChunk {
                content: split,
                source_file: source_file.to_string(),
                chunk_index: 0,
                token_count,
            }
        })
        .collect();

    chunks = merge_small_chunks(chunks, config);

    if config.overlap_size > 0 {
        add_overlap(&mut chunks, config);
    }

    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.chunk_index = i;
    }

    debug!(
        "Chunked '{}' into {} chunks (avg {} tokens)",
        source_file,
        chunks.len(),
        chunks.iter().map(|c| c.token_count).sum::<usize>() / chunks.len().max(1)
    );

    Ok(chunks)
}

/// Split a tagged-descriptions file into one chunk per non-empty line.
///
/// Each line carries a leading numeric identifier (`"<isbn13>": <text>`)
/// that the recommendation path parses back out of the stored chunk.
#[inline]
pub fn split_tagged_lines(text: &str, source_file: &str) -> Vec<DocumentChunk> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| DocumentChunk {
            content: line.to_string(),
            source_file: source_file.to_string(),
            chunk_index: i,
            token_count: estimate_token_count(line),
        })
        .collect()
}

/// Split text at paragraph boundaries, recursing into oversized paragraphs.
fn split_by_paragraphs(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut current_token_count = 0;

    for paragraph in text.split("\n\n") {
        if paragraph.trim().is_empty() {
            continue;
        }

        let paragraph_tokens = estimate_token_count(paragraph);

        if paragraph_tokens > config.max_chunk_size {
            // Oversized paragraph: recurse into sentences
            for sentence_split in split_by_sentences(paragraph, config) {
                let split_tokens = estimate_token_count(&sentence_split);
                if current_token_count + split_tokens > config.target_chunk_size
                    && !current_split.trim().is_empty()
                {
                    splits.push(current_split.trim().to_string());
                    current_split.clear();
                    current_token_count = 0;
                }
                current_split.push_str(&sentence_split);
                current_split.push_str("\n\n");
                current_token_count += split_tokens;
            }
        } else {
            if current_token_count + paragraph_tokens > config.target_chunk_size
                && !current_split.trim().is_empty()
            {
                splits.push(current_split.trim().to_string());
                current_split.clear();
                current_token_count = 0;
            }

            current_split.push_str(paragraph);
            current_split.push_str("\n\n");
            current_token_count += paragraph_tokens;
        }
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    splits
}

/// Split text by sentence boundaries, falling back to words for run-on text.
fn split_by_sentences(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut current_token_count = 0;

    let sentences = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for (i, sentence) in sentences.iter().enumerate() {
        let sentence_with_punct = if i < sentences.len() - 1 {
            format!("{}. ", sentence)
        } else {
            (*sentence).to_string()
        };

        let sentence_tokens = estimate_token_count(&sentence_with_punct);

        if sentence_tokens > config.max_chunk_size {
            // A single "sentence" over max size: force word-level splits
            for word_split in split_by_words(&sentence_with_punct, config) {
                splits.push(word_split);
            }
            continue;
        }

        if current_token_count + sentence_tokens > config.target_chunk_size
            && !current_split.trim().is_empty()
        {
            splits.push(current_split.trim().to_string());
            current_split.clear();
            current_token_count = 0;
        }

        current_split.push_str(&sentence_with_punct);
        current_token_count += sentence_tokens;
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    splits
}

/// Split text by whitespace as a last resort.
fn split_by_words(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut current_token_count = 0;

    for word in text.split_whitespace() {
        let word_with_space = format!("{} ", word);
        let word_tokens = estimate_token_count(&word_with_space);

        if current_token_count + word_tokens > config.target_chunk_size
            && !current_split.trim().is_empty()
        {
            splits.push(current_split.trim().to_string());
            current_split.clear();
            current_token_count = 0;
        }

        current_split.push_str(&word_with_space);
        current_token_count += word_tokens;
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    splits
}

/// Merge chunks below the minimum size into their predecessor when possible.
fn merge_small_chunks(chunks: Vec<DocumentChunk>, config: &ChunkingConfig) -> Vec<DocumentChunk> {
    let mut merged: Vec<DocumentChunk> = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        if chunk.token_count < config.min_chunk_size {
            if let Some(prev) = merged.last_mut() {
                if prev.token_count + chunk.token_count <= config.max_chunk_size {
                    prev.content.push_str("\n\n");
                    prev.content.push_str(&chunk.content);
                    prev.token_count += chunk.token_count;
                    continue;
                }
            }
        }
        merged.push(chunk);
    }

    merged
}

/// Prepend the tail of each chunk's predecessor as overlap context.
fn add_overlap(chunks: &mut [DocumentChunk], config: &ChunkingConfig) {
    let mut i = 1;
    while i < chunks.len() {
        let overlap_text = extract_overlap_text(&chunks[i - 1].content, config.overlap_size);
        if !overlap_text.is_empty() {
            let curr = &mut chunks[i];
            curr.content = format!("{}\n\n{}", overlap_text, curr.content);
            curr.token_count += estimate_token_count(&overlap_text);
        }
        i += 1;
    }
}

/// Extract overlap text from the end of a chunk
fn extract_overlap_text(content: &str, overlap_tokens: usize) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    let word_count = (overlap_tokens as f64 * 0.75) as usize; // Rough word-to-token ratio

    if words.len() <= word_count {
        return String::new();
    }

    words[words.len() - word_count.min(words.len())..].join(" ")
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
