//! Gemini embedding and generation over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;

/// The default Generative Language API base URL.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Output size of `models/embedding-001` and `models/text-embedding-004`.
const DEFAULT_DIMENSIONS: usize = 768;

/// Most `requests` accepted by one `batchEmbedContents` call.
const MAX_BATCH: usize = 100;

/// Sampling temperature for answers. Low, to keep answers close to the passages.
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// A Gemini client acting as both [`EmbeddingProvider`] and [`TextGenerator`].
///
/// Uses `reqwest` to call `embedContent`, `batchEmbedContents`, and
/// `generateContent` directly.
///
/// # Configuration
///
/// - `embedding_model` / `llm_model` – taken from [`RagConfig`].
/// - `api_key` – from the constructor or the `GOOGLE_API_KEY` (or
///   `GEMINI_API_KEY`) environment variable.
/// - Batch embeddings are requested as `RETRIEVAL_DOCUMENT`, single
///   embeddings (questions) as `RETRIEVAL_QUERY`.
///
/// # Example
///
/// ```rust,ignore
/// use paper_rag::gemini::GeminiClient;
///
/// let client = GeminiClient::from_env(&config)?;
/// let embedding = client.embed("hello world").await?;
/// ```
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    llm_model: String,
    dimensions: usize,
    temperature: f32,
}

impl GeminiClient {
    /// Create a client with the given API key and the models named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the key is empty.
    pub fn new(api_key: impl Into<String>, config: &RagConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            embedding_model: model_path(&config.embedding_model),
            llm_model: model_path(&config.llm_model),
            dimensions: DEFAULT_DIMENSIONS,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Create a client using the `GOOGLE_API_KEY` or `GEMINI_API_KEY` environment variable.
    pub fn from_env(config: &RagConfig) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| {
                RagError::ConfigError(
                    "GOOGLE_API_KEY not found; set it in the environment or a .env file".into(),
                )
            })?;
        Self::new(api_key, config)
    }

    /// Override the API base URL (e.g. a proxy or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Declare the dimensionality of the configured embedding model.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Set the sampling temperature used for answers.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/{model}:{method}", self.base_url)
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json::<R>().await.map_err(|e| format!("failed to parse response: {e}"))
    }

    /// One `batchEmbedContents` body per run of at most [`MAX_BATCH`] texts, in order.
    fn batch_requests<'a>(&'a self, texts: &[&'a str]) -> Vec<BatchEmbedContentsRequest<'a>> {
        texts
            .chunks(MAX_BATCH)
            .map(|batch| BatchEmbedContentsRequest {
                requests: batch
                    .iter()
                    .map(|&t| self.embed_request(t, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            })
            .collect()
    }

    fn embed_request<'a>(&'a self, text: &'a str, task_type: &'static str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.embedding_model,
            content: Content { role: None, parts: vec![Part { text }] },
            task_type,
        }
    }
}

/// Prefix a bare model id with `models/`.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Gemini", text_len = text.len(), "embedding query text");

        let url = self.url(&self.embedding_model, "embedContent");
        let request = self.embed_request(text, "RETRIEVAL_QUERY");
        let response: EmbedContentResponse = self.post(&url, &request).await.map_err(|message| {
            error!(provider = "Gemini", error = %message, "embedding request failed");
            RagError::EmbeddingError { provider: "Gemini".into(), message }
        })?;

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "Gemini",
            batch_size = texts.len(),
            model = %self.embedding_model,
            "embedding batch"
        );

        let url = self.url(&self.embedding_model, "batchEmbedContents");
        let mut embeddings = Vec::with_capacity(texts.len());
        for request in self.batch_requests(texts) {
            let expected = request.requests.len();
            let response: BatchEmbedContentsResponse =
                self.post(&url, &request).await.map_err(|message| {
                    error!(provider = "Gemini", error = %message, "batch embedding request failed");
                    RagError::EmbeddingError { provider: "Gemini".into(), message }
                })?;
            if response.embeddings.len() != expected {
                return Err(RagError::EmbeddingError {
                    provider: "Gemini".into(),
                    message: format!(
                        "expected {expected} embeddings, API returned {}",
                        response.embeddings.len()
                    ),
                });
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

// ── TextGenerator implementation ───────────────────────────────────

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = "Gemini", model = %self.llm_model, prompt_len = prompt.len(), "generating");

        let url = self.url(&self.llm_model, "generateContent");
        let request = GenerateContentRequest {
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };
        let response: GenerateContentResponse =
            self.post(&url, &request).await.map_err(|message| {
                error!(provider = "Gemini", error = %message, "generation request failed");
                RagError::GenerationError { provider: "Gemini".into(), message }
            })?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(RagError::GenerationError {
                provider: "Gemini".into(),
                message: "response contained no text".into(),
            });
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.llm_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_ids_get_models_prefix() {
        assert_eq!(model_path("gemini-2.5-flash"), "models/gemini-2.5-flash");
        assert_eq!(model_path("models/embedding-001"), "models/embedding-001");
    }

    #[test]
    fn empty_key_is_a_config_error() {
        let err = GeminiClient::new("  ", &RagConfig::default()).err().unwrap();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn large_batches_are_split() {
        let client = GeminiClient::new("k", &RagConfig::default()).unwrap();
        let owned: Vec<String> = (0..250).map(|i| format!("chunk {i}")).collect();
        let texts: Vec<&str> = owned.iter().map(String::as_str).collect();

        let batches = client.batch_requests(&texts);

        let sizes: Vec<usize> = batches.iter().map(|b| b.requests.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(batches[1].requests[0].content.parts[0].text, "chunk 100");
        assert_eq!(batches[2].requests[49].content.parts[0].text, "chunk 249");
        assert_eq!(batches[0].requests[0].task_type, "RETRIEVAL_DOCUMENT");
    }

    #[test]
    fn urls_use_model_paths() {
        let client = GeminiClient::new("k", &RagConfig::default())
            .unwrap()
            .with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(
            client.url(&client.llm_model, "generateContent"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
