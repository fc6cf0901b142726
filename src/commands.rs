// Command implementations for the CLI

use crate::catalog::BookCatalog;
use crate::chat::{ChatService, OllamaGenerator};
use crate::config::{Config, run_interactive_config, show_config};
use crate::database::VectorStore;
use crate::embeddings::OllamaClient;
use crate::ingest::{IngestOutcome, bootstrap_books, ingest_corpus};
use crate::recommend::{RecommendationFilter, Recommender};
use crate::server::{AppState, serve};
use crate::{Result, ShelfError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run the interactive configuration wizard, or print the current config.
#[inline]
pub fn config_command(show: bool) -> Result<()> {
    if show {
        show_config()?;
    } else {
        run_interactive_config()?;
    }
    Ok(())
}

/// Seed the books collection from the tagged-descriptions file.
#[inline]
pub async fn ingest_books_command(descriptions: Option<PathBuf>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(path) = descriptions {
        config.library.tagged_descriptions = path;
    }
    let embedder = OllamaClient::new(&config)?;
    embedder
        .health_check()
        .map_err(|e| ShelfError::Embedding(format!("Ollama is not reachable: {}", e)))?;

    let mut store = VectorStore::open(&config, "books").await?;
    match bootstrap_books(&config, &mut store, &embedder).await? {
        IngestOutcome::AlreadyPopulated { existing } => {
            println!(
                "Books collection already holds {} embeddings; nothing to do.",
                existing
            );
        }
        IngestOutcome::Seeded { chunks } => {
            println!("Seeded books collection with {} descriptions.", chunks);
        }
    }
    Ok(())
}

/// Ingest the test-case corpus directory.
#[inline]
pub async fn ingest_corpus_command(dir: Option<PathBuf>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(path) = dir {
        config.library.corpus_dir = path;
    }
    let embedder = OllamaClient::new(&config)?;
    embedder
        .health_check()
        .map_err(|e| ShelfError::Embedding(format!("Ollama is not reachable: {}", e)))?;

    let mut store = VectorStore::open(&config, "corpus").await?;
    match ingest_corpus(&config, &mut store, &embedder).await? {
        IngestOutcome::AlreadyPopulated { existing } => {
            println!(
                "Corpus collection already holds {} embeddings; nothing to do.",
                existing
            );
        }
        IngestOutcome::Seeded { chunks } => {
            println!("Ingested {} corpus chunks.", chunks);
        }
    }
    Ok(())
}

/// Recommend books for a query from the command line.
#[inline]
pub async fn recommend_command(query: &str, category: &str, tone: &str) -> Result<()> {
    let config = Config::load()?;
    let catalog = BookCatalog::load(&config.library.books_csv)?;
    let embedder = OllamaClient::new(&config)?;

    let mut store = VectorStore::open(&config, "books").await?;
    bootstrap_books(&config, &mut store, &embedder).await?;

    let filter = RecommendationFilter::from_choices(category, tone);
    let recommender = Recommender::new(&store, &catalog, &embedder);
    let books = recommender.recommend(query, &filter).await?;

    if books.is_empty() {
        println!("No recommendations found.");
        return Ok(());
    }

    for (i, book) in books.iter().enumerate() {
        println!("{:2}. {} ({})", i + 1, book.title, book.simple_categories);
        println!("    {}", book.gallery_caption());
    }
    Ok(())
}

/// Ask the test-case chatbot one question.
#[inline]
pub async fn ask_command(question: &str, direct: bool) -> Result<()> {
    let config = Config::load()?;
    let embedder = OllamaClient::new(&config)?;
    let generator = OllamaGenerator::new(&config)?;

    let mut store = VectorStore::open(&config, "corpus").await?;
    if !direct {
        ingest_corpus(&config, &mut store, &embedder).await?;
    }

    let service = ChatService::new(&store, &embedder, &generator);
    let answer = if direct {
        service.answer_direct(question)
    } else {
        service.answer(question).await
    };

    println!("{}", answer);
    Ok(())
}

/// Start the web UI, ingesting both collections first.
#[inline]
pub async fn serve_command(port: Option<u16>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = port {
        config.server.port = port;
    }
    let catalog = BookCatalog::load(&config.library.books_csv)?;
    let embedder = OllamaClient::new(&config)?;
    let generator = OllamaGenerator::new(&config)?;

    let mut books = VectorStore::open(&config, "books").await?;
    bootstrap_books(&config, &mut books, &embedder).await?;

    let mut corpus = VectorStore::open(&config, "corpus").await?;
    ingest_corpus(&config, &mut corpus, &embedder).await?;

    info!(
        "Starting server with {} books and {} corpus embeddings",
        books.count_embeddings().await?,
        corpus.count_embeddings().await?
    );

    let state = Arc::new(AppState {
        config,
        catalog,
        books,
        corpus,
        embedder: Box::new(embedder),
        generator: Box::new(generator),
    });

    serve(state).await
}

/// Print collection counts and configuration locations.
#[inline]
pub async fn status_command() -> Result<()> {
    let config = Config::load()?;

    println!("Config file:     {}", config.config_file_path().display());
    println!("Vector database: {}", config.vector_database_path().display());
    println!("Books CSV:       {}", config.library.books_csv.display());
    println!(
        "Seed file:       {}",
        config.library.tagged_descriptions.display()
    );
    println!("Corpus dir:      {}", config.library.corpus_dir.display());

    let books = VectorStore::open(&config, "books").await?;
    let corpus = VectorStore::open(&config, "corpus").await?;
    println!("Books embeddings:  {}", books.count_embeddings().await?);
    println!("Corpus embeddings: {}", corpus.count_embeddings().await?);

    match OllamaClient::new(&config)?.ping() {
        Ok(()) => println!("Ollama:            reachable"),
        Err(e) => println!("Ollama:            unreachable ({})", e),
    }

    Ok(())
}
