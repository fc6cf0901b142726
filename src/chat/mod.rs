// Chat module
// Retrieval-augmented test-case generation over the corpus collection


use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::Embedder;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Chunks retrieved per question.
pub const RETRIEVAL_K: usize = 4;

/// Generation can be slow on local models; allow a generous window.
const GENERATION_TIMEOUT_SECONDS: u64 = 120;
const GENERATION_RETRY_ATTEMPTS: u32 = 2;

/// System prompt for the plain (non-retrieval) chat path.
pub const DIRECT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant for a software testing team. Answer clearly and concisely.";

/// Canned prompt behind the "generate test cases" button.
pub const MANUAL_TESTCASE_PROMPT: &str = "Generate test cases for the pet store demo site. \
    Use equivalence partitioning and boundary value analysis to cover the features as \
    thoroughly as possible.";

/// Canned prompt behind the "generate automated tests" button.
pub const AUTO_TESTCASE_PROMPT: &str = "Generate automated test cases for the pet store demo \
    site, implemented with pytest and selenium.";

/// Answer returned when the corpus collection holds no embeddings.
pub const EMPTY_STORE_MESSAGE: &str =
    "The document store is empty, so nothing can be retrieved. Ingest the corpus first.";

/// Seam between the chat service and the LLM backend.
///
/// Production code uses [`OllamaGenerator`]; tests substitute a canned
/// implementation.
pub trait Generator: Send + Sync {
    /// Complete a prompt, optionally under a system instruction.
    fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Synchronous HTTP client for the Ollama generation API
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(GENERATION_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.ollama.chat_model.clone(),
            api_key: config.ollama.api_key.clone(),
            agent,
        })
    }
}

impl Generator for OllamaGenerator {
    #[inline]
    fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generation URL")?;

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system: system.map(str::to_string),
            stream: false,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let mut last_error = None;
        for attempt in 1..=GENERATION_RETRY_ATTEMPTS {
            debug!(
                "Generation request attempt {}/{} for model {}",
                attempt, GENERATION_RETRY_ATTEMPTS, self.model
            );

            let mut builder = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json");
            if let Some(key) = &self.api_key {
                builder = builder.header("Authorization", &format!("Bearer {}", key));
            }

            match builder
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
            {
                Ok(body) => {
                    let parsed: GenerateResponse = serde_json::from_str(&body)
                        .context("Failed to parse generation response")?;
                    return Ok(parsed.response);
                }
                Err(ureq::Error::StatusCode(status)) if status < 500 => {
                    return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                }
                Err(error) => {
                    warn!(
                        "Generation attempt {}/{} failed: {}",
                        attempt, GENERATION_RETRY_ATTEMPTS, error
                    );
                    last_error = Some(anyhow::anyhow!("Generation request error: {}", error));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

/// Build the retrieval-augmented prompt from a question and its context.
#[inline]
pub fn rag_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an assistant for question-answering tasks. Use the following pieces of \
         retrieved context to answer the question. If you don't know the answer, just say \
         that you don't know.\nQuestion: {}\nContext: {}\nAnswer:",
        question, context
    )
}

/// Retrieval-augmented chat over the `corpus` collection.
pub struct ChatService<'a> {
    store: &'a VectorStore,
    embedder: &'a dyn Embedder,
    generator: &'a dyn Generator,
}

impl<'a> ChatService<'a> {
    #[inline]
    pub fn new(
        store: &'a VectorStore,
        embedder: &'a dyn Embedder,
        generator: &'a dyn Generator,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
        }
    }

    /// Answer a question with retrieved context.
    ///
    /// Failures do not propagate: an empty store, a retrieval error, or a
    /// generation error each collapse into a user-facing message.
    #[inline]
    pub async fn answer(&self, question: &str) -> String {
        match self.answer_with_context(question).await {
            Ok(answer) => answer,
            Err(message) => message,
        }
    }

    async fn answer_with_context(&self, question: &str) -> Result<String, String> {
        let count = self
            .store
            .count_embeddings()
            .await
            .map_err(|e| format!("Retrieval failed: {}", e))?;
        if count == 0 {
            warn!("Corpus collection is empty, refusing to answer");
            return Err(EMPTY_STORE_MESSAGE.to_string());
        }

        let query_vector = self
            .embedder
            .embed(question)
            .map_err(|e| format!("Retrieval failed: {}", e))?;

        let results = self
            .store
            .search_similar(&query_vector, RETRIEVAL_K)
            .await
            .map_err(|e| format!("Retrieval failed: {}", e))?;

        let context = results
            .iter()
            .map(|r| r.chunk_metadata.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        debug!(
            "Retrieved {} chunks ({} chars of context) for question '{:.60}'",
            results.len(),
            context.len(),
            question
        );

        self.generator
            .generate(&rag_prompt(question, &context), None)
            .map_err(|e| format!("Generation failed: {}", e))
    }

    /// Answer a question without retrieval, using the plain chat path.
    #[inline]
    pub fn answer_direct(&self, question: &str) -> String {
        match self
            .generator
            .generate(question, Some(DIRECT_SYSTEM_PROMPT))
        {
            Ok(answer) => answer,
            Err(e) => format!("Generation failed: {}", e),
        }
    }

    /// Canned business-test-case generation, as triggered by the dashboard
    /// button. Falls back to the canned prompt when the message is empty.
    #[inline]
    pub async fn generate_testcases(&self, message: &str, automated: bool) -> (String, String) {
        let default_prompt = if automated {
            AUTO_TESTCASE_PROMPT
        } else {
            MANUAL_TESTCASE_PROMPT
        };
        let question = if message.trim().is_empty() {
            default_prompt.to_string()
        } else {
            message.to_string()
        };

        let answer = self.answer(&question).await;
        (question, answer)
    }
}
