//! Configuration for the RAG pipeline.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the RAG pipeline.
///
/// Built explicitly via [`RagConfig::builder()`] or read from environment
/// variables via [`RagConfig::from_env()`], then injected into the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Root directory for persisted vector collections.
    pub vector_db_path: PathBuf,
    /// Staging directory for raw uploads. Only used by callers.
    pub uploads_path: PathBuf,
    /// Embedding model identifier, passed opaquely to the provider.
    pub embedding_model: String,
    /// Generation model identifier, passed opaquely to the generator.
    pub llm_model: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results. `None` keeps everything.
    pub similarity_threshold: Option<f32>,
    /// Upper bound on each embedding or generation call.
    pub request_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            vector_db_path: PathBuf::from("./data/vector_db"),
            uploads_path: PathBuf::from("./data/uploads"),
            embedding_model: "models/embedding-001".to_string(),
            llm_model: "gemini-2.5-flash".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            similarity_threshold: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load configuration from process environment variables.
    ///
    /// Recognized keys: `VECTOR_DB_PATH`, `UPLOADS_PATH`, `EMBEDDING_MODEL`,
    /// `LLM_MODEL`, `CHUNK_SIZE`, `CHUNK_OVERLAP`, `TOP_K`,
    /// `SIMILARITY_THRESHOLD`, `REQUEST_TIMEOUT_SECS`. Unset keys fall back to
    /// [`RagConfig::default()`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a value does not parse or the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = RagConfigBuilder::default();

        if let Some(path) = lookup("VECTOR_DB_PATH") {
            builder = builder.vector_db_path(path);
        }
        if let Some(path) = lookup("UPLOADS_PATH") {
            builder = builder.uploads_path(path);
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            builder = builder.embedding_model(model);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            builder = builder.llm_model(model);
        }
        if let Some(size) = parse_key::<usize>(&lookup, "CHUNK_SIZE")? {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = parse_key::<usize>(&lookup, "CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(k) = parse_key::<usize>(&lookup, "TOP_K")? {
            builder = builder.top_k(k);
        }
        if let Some(threshold) = parse_key::<f32>(&lookup, "SIMILARITY_THRESHOLD")? {
            builder = builder.similarity_threshold(threshold);
        }
        if let Some(secs) = parse_key::<u64>(&lookup, "REQUEST_TIMEOUT_SECS")? {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }
}

fn parse_key<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RagError::ConfigError(format!("{key}={raw:?} is not valid: {e}"))),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the vector storage root directory.
    pub fn vector_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.vector_db_path = path.into();
        self
    }

    /// Set the upload staging directory.
    pub fn uploads_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.uploads_path = path.into();
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the generation model identifier.
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = model.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the timeout applied to each embedding or generation call.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `similarity_threshold` is NaN
    /// - `request_timeout` is zero
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.similarity_threshold.is_some_and(f32::is_nan) {
            return Err(RagError::ConfigError("similarity_threshold must be a number".to_string()));
        }
        if config.request_timeout.is_zero() {
            return Err(RagError::ConfigError(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}
