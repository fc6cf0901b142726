use clap::{Parser, Subcommand};
use shelfchat::commands;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shelfchat")]
#[command(
    about = "Semantic book recommendations and a test-case chatbot over a local vector store"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and data locations
    Config {
        /// Print the current configuration instead of editing it
        #[arg(long)]
        show: bool,
    },
    /// Seed the books collection from the tagged-descriptions file
    IngestBooks {
        /// Override the configured tagged-descriptions file
        #[arg(long)]
        descriptions: Option<PathBuf>,
    },
    /// Ingest the test-case corpus directory
    IngestCorpus {
        /// Override the configured corpus directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Recommend books for a free-text query
    Recommend {
        /// What kind of book to look for
        query: String,
        /// Restrict results to one category
        #[arg(long, default_value = "All")]
        category: String,
        /// Re-rank by emotional tone (Happy, Surprising, Angry, Suspenseful, Sad)
        #[arg(long, default_value = "All")]
        tone: String,
    },
    /// Ask the test-case chatbot one question
    Ask {
        /// The question to answer
        question: String,
        /// Skip retrieval and chat directly with the model
        #[arg(long)]
        direct: bool,
    },
    /// Start the browser UI
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show collection counts and configuration locations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shelfchat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => commands::config_command(show)?,
        Commands::IngestBooks { descriptions } => {
            commands::ingest_books_command(descriptions).await?;
        }
        Commands::IngestCorpus { dir } => commands::ingest_corpus_command(dir).await?,
        Commands::Recommend {
            query,
            category,
            tone,
        } => commands::recommend_command(&query, &category, &tone).await?,
        Commands::Ask { question, direct } => commands::ask_command(&question, direct).await?,
        Commands::Serve { port } => commands::serve_command(port).await?,
        Commands::Status => commands::status_command().await?,
    }

    Ok(())
}
