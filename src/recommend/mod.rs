// Recommendation module
// Joins vector search hits back to catalog rows and applies reader filters


use crate::catalog::{BookCatalog, BookRecord, Tone};
use crate::database::VectorStore;
use crate::embeddings::Embedder;
use crate::{Result, ShelfError};
use tracing::{debug, warn};

/// Candidates pulled from the vector store before filtering.
pub const INITIAL_TOP_K: usize = 50;
/// Recommendations surfaced to the reader after filtering.
pub const FINAL_TOP_K: usize = 16;

/// Filters applied on top of semantic retrieval.
#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    /// Restrict to one category; `None` means all categories.
    pub category: Option<String>,
    /// Re-rank by emotional tone; `None` keeps retrieval order.
    pub tone: Option<Tone>,
}

impl RecommendationFilter {
    /// Build a filter from the UI's dropdown values, where `"All"` means no
    /// restriction.
    #[inline]
    pub fn from_choices(category: &str, tone: &str) -> Self {
        Self {
            category: (category != "All" && !category.is_empty())
                .then(|| category.to_string()),
            tone: Tone::parse(tone),
        }
    }
}

/// Parse the isbn13 a tagged description chunk was stored under.
///
/// Stored chunks look like `"9780002005883": <description>`; the identifier
/// is everything before the first colon, with surrounding quotes stripped.
#[inline]
pub fn parse_chunk_isbn(content: &str) -> Option<i64> {
    let prefix = content.split(':').next()?;
    prefix.trim().trim_matches('"').parse().ok()
}

/// Rank retrieved chunk contents against the catalog.
///
/// Retrieval order is preserved through the join; the optional category
/// filter narrows the pool, and the optional tone re-ranks by its emotion
/// score (stable, so ties keep retrieval order). Malformed chunk identifiers
/// and identifiers missing from the catalog are skipped with a warning.
#[inline]
pub fn rank_books<'a>(
    retrieved: &[String],
    catalog: &'a BookCatalog,
    filter: &RecommendationFilter,
) -> Vec<&'a BookRecord> {
    let mut books: Vec<&BookRecord> = Vec::with_capacity(retrieved.len());

    for content in retrieved {
        let Some(isbn13) = parse_chunk_isbn(content) else {
            warn!("Skipping chunk with malformed identifier: {:.40}", content);
            continue;
        };
        match catalog.get(isbn13) {
            Some(book) => books.push(book),
            None => warn!("Retrieved isbn13 {} not present in catalog", isbn13),
        }
    }

    if let Some(category) = &filter.category {
        books.retain(|book| &book.simple_categories == category);
    }

    if let Some(tone) = filter.tone {
        books.sort_by(|a, b| {
            tone.score(b)
                .partial_cmp(&tone.score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    books.truncate(FINAL_TOP_K);
    books
}

/// Semantic book recommender over the `books` collection.
pub struct Recommender<'a> {
    store: &'a VectorStore,
    catalog: &'a BookCatalog,
    embedder: &'a dyn Embedder,
}

impl<'a> Recommender<'a> {
    #[inline]
    pub fn new(
        store: &'a VectorStore,
        catalog: &'a BookCatalog,
        embedder: &'a dyn Embedder,
    ) -> Self {
        Self {
            store,
            catalog,
            embedder,
        }
    }

    /// Recommend books for a free-text query.
    ///
    /// Embeds the query, retrieves the nearest tagged descriptions, joins
    /// them back to catalog rows, and applies the reader's filters.
    #[inline]
    pub async fn recommend(
        &self,
        query: &str,
        filter: &RecommendationFilter,
    ) -> Result<Vec<&'a BookRecord>> {
        let query_vector = self
            .embedder
            .embed(query)
            .map_err(|e| ShelfError::Embedding(format!("Failed to embed query: {}", e)))?;

        let results = self
            .store
            .search_similar(&query_vector, INITIAL_TOP_K)
            .await?;

        debug!(
            "Retrieved {} candidate descriptions for query '{:.60}'",
            results.len(),
            query
        );

        let contents: Vec<String> = results
            .into_iter()
            .map(|r| r.chunk_metadata.content)
            .collect();

        Ok(rank_books(&contents, self.catalog, filter))
    }
}
