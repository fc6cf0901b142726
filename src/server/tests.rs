use super::*;
use crate::catalog::BookRecord;
use crate::database::{ChunkMetadata, EmbeddingRecord};
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let sum: u32 = text.bytes().map(u32::from).sum();
        Ok(vec![
            (sum % 97) as f32 / 97.0,
            (sum % 31) as f32 / 31.0,
            text.len() as f32 / 1000.0,
            1.0,
            0.0,
        ])
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

struct StubGenerator;

impl Generator for StubGenerator {
    fn generate(&self, _prompt: &str, _system: Option<&str>) -> anyhow::Result<String> {
        Ok("Generated answer.".to_string())
    }
}

fn book(isbn13: i64, title: &str, category: &str, joy: f64) -> BookRecord {
    BookRecord {
        isbn13,
        title: title.to_string(),
        authors: "Test Author".to_string(),
        description: "A test description of the book.".to_string(),
        simple_categories: category.to_string(),
        joy,
        surprise: 0.1,
        anger: 0.1,
        fear: 0.1,
        sadness: 0.1,
        thumbnail: None,
    }
}

fn record_for(content: &str, index: u32) -> EmbeddingRecord {
    EmbeddingRecord {
        id: format!("rec-{}", index),
        vector: StubEmbedder.embed(content).expect("stub embeds"),
        metadata: ChunkMetadata {
            chunk_id: format!("seed#{}", index),
            source_file: "seed".to_string(),
            content: content.to_string(),
            token_count: 5,
            chunk_index: index,
            created_at: chrono::Utc::now().to_rfc3339(),
        },
    }
}

async fn test_state(temp_dir: &TempDir, seed_corpus: bool) -> Arc<AppState> {
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };

    let catalog = BookCatalog::from_records(vec![
        book(1, "First", "Fiction", 0.9),
        book(2, "Second", "Nonfiction", 0.2),
    ]);

    let mut books = VectorStore::open(&config, "books").await.expect("books");
    books
        .store_embeddings_batch(vec![
            record_for("\"1\": A happy story about friendship.", 0),
            record_for("\"2\": A factual account of bridges.", 1),
        ])
        .await
        .expect("books seeded");

    let mut corpus = VectorStore::open(&config, "corpus").await.expect("corpus");
    if seed_corpus {
        corpus
            .store_embeddings_batch(vec![
                record_for("The pet store supports searching by category.", 0),
            ])
            .await
            .expect("corpus seeded");
    }

    Arc::new(AppState {
        config,
        catalog,
        books,
        corpus,
        embedder: Box::new(StubEmbedder),
        generator: Box::new(StubGenerator),
    })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collected")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is json")
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request built")
}

#[tokio::test]
async fn dashboard_and_chat_pages_are_served() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, true).await;
    let app = router(state);

    for uri in ["/", "/chat"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("req"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn health_reports_counts() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, true).await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("req"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["books_embeddings"], 2);
    assert_eq!(json["corpus_embeddings"], 1);
    assert_eq!(json["catalog_size"], 2);
}

#[tokio::test]
async fn filters_list_categories_and_tones() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, true).await;
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/filters")
                .body(Body::empty())
                .expect("req"),
        )
        .await
        .expect("response");
    let json = body_json(response).await;

    assert_eq!(json["categories"][0], "All");
    assert!(
        json["categories"]
            .as_array()
            .expect("categories array")
            .contains(&serde_json::json!("Fiction"))
    );
    assert_eq!(json["tones"][0], "All");
    assert_eq!(json["tones"].as_array().expect("tones array").len(), 6);
}

#[tokio::test]
async fn recommend_returns_joined_books() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, true).await;
    let app = router(state);

    let response = app
        .oneshot(json_request(
            "/api/recommend",
            serde_json::json!({"query": "a story about friends"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let books = json["books"].as_array().expect("books array");
    assert_eq!(books.len(), 2);
    assert_eq!(books[0]["thumbnail"], crate::catalog::FALLBACK_THUMBNAIL);
}

#[tokio::test]
async fn recommend_applies_category_filter() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, true).await;
    let app = router(state);

    let response = app
        .oneshot(json_request(
            "/api/recommend",
            serde_json::json!({"query": "anything", "category": "Nonfiction", "tone": "All"}),
        ))
        .await
        .expect("response");
    let json = body_json(response).await;

    let books = json["books"].as_array().expect("books array");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Second");
}

#[tokio::test]
async fn recommend_rejects_empty_query() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, true).await;
    let app = router(state);

    let response = app
        .oneshot(json_request(
            "/api/recommend",
            serde_json::json!({"query": "   "}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_answers_with_rag() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, true).await;
    let app = router(state);

    let response = app
        .oneshot(json_request(
            "/api/chat",
            serde_json::json!({"message": "How does search work?"}),
        ))
        .await
        .expect("response");
    let json = body_json(response).await;

    assert_eq!(json["question"], "How does search work?");
    assert_eq!(json["answer"], "Generated answer.");
}

#[tokio::test]
async fn chat_empty_corpus_returns_message() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, false).await;
    let app = router(state);

    let response = app
        .oneshot(json_request(
            "/api/chat",
            serde_json::json!({"message": "Anything?"}),
        ))
        .await
        .expect("response");
    let json = body_json(response).await;
    assert_eq!(json["answer"], crate::chat::EMPTY_STORE_MESSAGE);
}

#[tokio::test]
async fn chat_canned_testcase_modes() {
    let temp_dir = TempDir::new().expect("temp dir");
    let state = test_state(&temp_dir, true).await;
    let app = router(state);

    let response = app
        .oneshot(json_request(
            "/api/chat",
            serde_json::json!({"mode": "manual_testcases"}),
        ))
        .await
        .expect("response");
    let json = body_json(response).await;
    assert_eq!(json["question"], crate::chat::MANUAL_TESTCASE_PROMPT);
    assert_eq!(json["answer"], "Generated answer.");
}
