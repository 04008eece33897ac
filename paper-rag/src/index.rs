//! Topic-scoped index: embeds chunks and keeps them in a [`VectorStore`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::deadline;
use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Embeds chunks with an [`EmbeddingProvider`] and stores them per topic.
///
/// Each topic is one collection in the underlying store. Upserting the same
/// chunk id twice overwrites the first entry, so re-running an ingest is
/// idempotent. The index never retries a failed embedding call.
pub struct TopicIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    timeout: Duration,
}

impl TopicIndex {
    /// Create an index over `store`, embedding with `embedder`.
    ///
    /// `timeout` bounds every embedding call.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        timeout: Duration,
    ) -> Self {
        Self { embedder, store, timeout }
    }

    /// The embedding provider used for chunks and queries.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// The underlying vector store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Create the topic's collection if it does not exist yet.
    ///
    /// Logs a warning when the existing collection was built with a different
    /// embedding model than the current provider.
    pub async fn ensure_topic(&self, topic: &str) -> Result<()> {
        if let Some(info) = self.store.collection_info(topic).await? {
            let model = self.embedder.model_name();
            if info.embedding_model != model {
                warn!(
                    topic,
                    stored_model = %info.embedding_model,
                    current_model = model,
                    "topic was indexed with a different embedding model; scores may be meaningless"
                );
            }
            return Ok(());
        }
        self.store
            .create_collection(topic, self.embedder.dimensions(), self.embedder.model_name())
            .await
    }

    /// Attach embeddings to `chunks` in place, with one batch call.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the provider fails or returns
    /// the wrong number of vectors, and [`RagError::Timeout`] if the call
    /// exceeds the configured timeout.
    pub async fn embed(&self, chunks: &mut [Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings =
            deadline::within("embed", self.timeout, self.embedder.embed_batch(&texts)).await?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedder.model_name().to_string(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        Ok(())
    }

    /// Store already-embedded chunks under `topic`, creating the topic if needed.
    pub async fn store_chunks(&self, topic: &str, chunks: &mut [Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        for chunk in chunks.iter_mut() {
            chunk.topic = topic.to_string();
        }
        self.ensure_topic(topic).await?;
        self.store.upsert(topic, chunks).await?;
        debug!(topic, chunk_count = chunks.len(), "stored chunks");
        Ok(())
    }

    /// Embed and store `chunks` under `topic`. Returns the stored chunks.
    pub async fn upsert(&self, topic: &str, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        self.embed(&mut chunks).await?;
        self.store_chunks(topic, &mut chunks).await?;
        Ok(chunks)
    }

    /// Embed a query string with the same provider used for chunks.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        deadline::within("embed", self.timeout, self.embedder.embed(text)).await
    }

    /// The `k` entries of `topic` most similar to `vector`, best first.
    ///
    /// A topic with no entries yields an empty `Vec`.
    pub async fn search(&self, topic: &str, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.store.search(topic, vector, k).await
    }
}
