// HTTP server module
// Browser UI and JSON API for the recommender and the test-case chatbot

#[cfg(test)]
mod tests;

use crate::catalog::BookCatalog;
use crate::chat::{ChatService, Generator};
use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::Embedder;
use crate::recommend::{RecommendationFilter, Recommender};
use crate::{Result, ShelfError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

const DASHBOARD_HTML: &str = include_str!("assets/dashboard.html");
const CHAT_HTML: &str = include_str!("assets/chat.html");

/// Shared application state behind every handler.
pub struct AppState {
    pub config: Config,
    pub catalog: BookCatalog,
    pub books: VectorStore,
    pub corpus: VectorStore,
    pub embedder: Box<dyn Embedder>,
    pub generator: Box<dyn Generator>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
    #[serde(default = "all_choice")]
    pub category: String,
    #[serde(default = "all_choice")]
    pub tone: String,
}

fn all_choice() -> String {
    "All".to_string()
}

#[derive(Debug, Serialize)]
pub struct RecommendedBook {
    pub isbn13: i64,
    pub title: String,
    pub thumbnail: String,
    pub caption: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub books: Vec<RecommendedBook>,
}

/// How a chat message should be handled.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Retrieval-augmented answer over the corpus
    #[default]
    Rag,
    /// Plain chat without retrieval
    Direct,
    /// Canned business test-case generation
    ManualTestcases,
    /// Canned automated test-case generation
    AutoTestcases,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub mode: ChatMode,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub question: String,
    pub answer: String,
}

/// Build the application router with all routes and middleware.
#[inline]
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(dashboard_page))
        .route("/chat", get(chat_page))
        .route("/health", get(health))
        .route("/api/filters", get(get_filters))
        .route("/api/recommend", post(post_recommend))
        .route("/api/chat", post(post_chat))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

/// Bind the configured address and serve until shutdown.
#[inline]
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ShelfError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Serving on http://{}", addr);
    axum::serve(listener, router(state))
        .await
        .map_err(|e| ShelfError::Other(anyhow::anyhow!("Server error: {}", e)))?;

    Ok(())
}

async fn dashboard_page() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn chat_page() -> Html<&'static str> {
    Html(CHAT_HTML)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let books = state.books.count_embeddings().await.unwrap_or(0);
    let corpus = state.corpus.count_embeddings().await.unwrap_or(0);
    Json(json!({
        "status": "ok",
        "books_embeddings": books,
        "corpus_embeddings": corpus,
        "catalog_size": state.catalog.len(),
    }))
}

async fn get_filters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "categories": state.catalog.categories(),
        "tones": BookCatalog::tones(),
    }))
}

async fn post_recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> std::result::Result<Json<RecommendResponse>, (StatusCode, String)> {
    if request.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query must not be empty".to_string()));
    }

    let filter = RecommendationFilter::from_choices(&request.category, &request.tone);
    let recommender = Recommender::new(&state.books, &state.catalog, state.embedder.as_ref());

    let books = recommender
        .recommend(&request.query, &filter)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let books = books
        .into_iter()
        .map(|book| RecommendedBook {
            isbn13: book.isbn13,
            title: book.title.clone(),
            thumbnail: book.large_thumbnail(),
            caption: book.gallery_caption(),
        })
        .collect();

    Ok(Json(RecommendResponse { books }))
}

async fn post_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let service = ChatService::new(
        &state.corpus,
        state.embedder.as_ref(),
        state.generator.as_ref(),
    );

    let (question, answer) = match request.mode {
        ChatMode::Rag => {
            let answer = service.answer(&request.message).await;
            (request.message, answer)
        }
        ChatMode::Direct => {
            let answer = service.answer_direct(&request.message);
            (request.message, answer)
        }
        ChatMode::ManualTestcases => service.generate_testcases(&request.message, false).await,
        ChatMode::AutoTestcases => service.generate_testcases(&request.message, true).await,
    };

    Json(ChatResponse { question, answer })
}
