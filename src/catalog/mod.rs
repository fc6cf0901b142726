// Book catalog module
// Loads the enriched book CSV and provides presentation helpers

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Thumbnail shown when a book has no cover image.
pub const FALLBACK_THUMBNAIL: &str = "not_found.jpg";

const CAPTION_WORD_LIMIT: usize = 30;

/// One row of the enriched book CSV.
///
/// Emotion columns hold per-book scores in `[0, 1]` produced by an offline
/// classifier run over the description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookRecord {
    pub isbn13: i64,
    pub title: String,
    pub authors: String,
    pub description: String,
    pub simple_categories: String,
    pub joy: f64,
    pub surprise: f64,
    pub anger: f64,
    pub fear: f64,
    pub sadness: f64,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Emotional tone a reader can filter recommendations by.
///
/// Each tone maps onto one of the per-book emotion scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Happy,
    Surprising,
    Angry,
    Suspenseful,
    Sad,
}

impl Tone {
    /// All tones in display order.
    pub const ALL: [Tone; 5] = [
        Tone::Happy,
        Tone::Surprising,
        Tone::Angry,
        Tone::Suspenseful,
        Tone::Sad,
    ];

    /// Parse a tone from its display name. `"All"` and unknown values yield
    /// `None` (no tone filter).
    #[inline]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Happy" => Some(Tone::Happy),
            "Surprising" => Some(Tone::Surprising),
            "Angry" => Some(Tone::Angry),
            "Suspenseful" => Some(Tone::Suspenseful),
            "Sad" => Some(Tone::Sad),
            _ => None,
        }
    }

    #[inline]
    pub fn display_name(self) -> &'static str {
        match self {
            Tone::Happy => "Happy",
            Tone::Surprising => "Surprising",
            Tone::Angry => "Angry",
            Tone::Suspenseful => "Suspenseful",
            Tone::Sad => "Sad",
        }
    }

    /// The emotion score this tone sorts by.
    #[inline]
    pub fn score(self, book: &BookRecord) -> f64 {
        match self {
            Tone::Happy => book.joy,
            Tone::Surprising => book.surprise,
            Tone::Angry => book.anger,
            Tone::Suspenseful => book.fear,
            Tone::Sad => book.sadness,
        }
    }
}

impl BookRecord {
    /// Cover thumbnail URL upscaled for gallery display, with a local
    /// placeholder for books without covers.
    #[inline]
    pub fn large_thumbnail(&self) -> String {
        match &self.thumbnail {
            Some(url) if !url.trim().is_empty() => format!("{}&fife=w800", url),
            _ => FALLBACK_THUMBNAIL.to_string(),
        }
    }

    /// Authors formatted for display.
    ///
    /// The CSV stores authors as a `;`-separated list. Two authors are joined
    /// with a space; three or more become "A, B and C".
    #[inline]
    pub fn formatted_authors(&self) -> String {
        let authors: Vec<&str> = self
            .authors
            .split(';')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect();

        match authors.len() {
            0 => String::new(),
            1 => authors[0].to_string(),
            2 => format!("{} {}", authors[0], authors[1]),
            n => format!("{} and {}", authors[..n - 1].join(", "), authors[n - 1]),
        }
    }

    /// Description truncated to the first thirty words for gallery captions.
    #[inline]
    pub fn caption(&self) -> String {
        let words: Vec<&str> = self.description.split_whitespace().collect();
        if words.len() <= CAPTION_WORD_LIMIT {
            words.join(" ")
        } else {
            format!("{}...", words[..CAPTION_WORD_LIMIT].join(" "))
        }
    }

    /// Full caption shown under each gallery tile.
    #[inline]
    pub fn gallery_caption(&self) -> String {
        format!("{} by {}: {}", self.title, self.formatted_authors(), self.caption())
    }
}

/// In-memory catalog of all books, keyed by isbn13 for the join against
/// vector search results.
pub struct BookCatalog {
    books: Vec<BookRecord>,
    by_isbn: HashMap<i64, usize>,
}

impl BookCatalog {
    /// Load the catalog from the enriched book CSV.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading book catalog from {}", path.display());

        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open book CSV: {}", path.display()))?;

        let mut books = Vec::new();
        for result in reader.deserialize() {
            let record: BookRecord = result
                .with_context(|| format!("Failed to parse book CSV row in {}", path.display()))?;
            books.push(record);
        }

        let by_isbn = books
            .iter()
            .enumerate()
            .map(|(i, book)| (book.isbn13, i))
            .collect();

        info!("Loaded {} books from {}", books.len(), path.display());
        Ok(Self { books, by_isbn })
    }

    /// Build a catalog directly from records (used by tests and seeding).
    #[inline]
    pub fn from_records(books: Vec<BookRecord>) -> Self {
        let by_isbn = books
            .iter()
            .enumerate()
            .map(|(i, book)| (book.isbn13, i))
            .collect();
        Self { books, by_isbn }
    }

    #[inline]
    pub fn get(&self, isbn13: i64) -> Option<&BookRecord> {
        self.by_isbn.get(&isbn13).map(|&i| &self.books[i])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    #[inline]
    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    /// Category filter choices: `"All"` followed by the distinct categories
    /// in sorted order.
    #[inline]
    pub fn categories(&self) -> Vec<String> {
        let mut categories = vec!["All".to_string()];
        categories.extend(
            self.books
                .iter()
                .map(|b| b.simple_categories.clone())
                .sorted()
                .dedup(),
        );
        categories
    }

    /// Tone filter choices: `"All"` followed by the five tones.
    #[inline]
    pub fn tones() -> Vec<String> {
        let mut tones = vec!["All".to_string()];
        tones.extend(Tone::ALL.iter().map(|t| t.display_name().to_string()));
        tones
    }
}
