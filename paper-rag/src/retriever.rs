//! Question → ranked chunks.

use std::sync::Arc;

use tracing::debug;

use crate::document::SearchResult;
use crate::error::{Result, Stage};
use crate::index::TopicIndex;

/// Embeds a question and fetches the most relevant chunks of a topic.
///
/// Results scoring below the optional threshold are dropped. An empty result
/// is a normal outcome: it means no page of the topic is relevant enough.
pub struct Retriever {
    index: Arc<TopicIndex>,
    threshold: Option<f32>,
}

impl Retriever {
    /// Create a retriever over `index`, keeping only results scoring at least
    /// `threshold` when one is given.
    pub fn new(index: Arc<TopicIndex>, threshold: Option<f32>) -> Self {
        Self { index, threshold }
    }

    /// The minimum score a result must reach, if any.
    pub fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    /// Retrieve at most `k` chunks of `topic` relevant to `question`,
    /// ordered by descending score.
    ///
    /// # Errors
    ///
    /// Failures are wrapped in [`RagError::Query`](crate::RagError::Query) carrying the topic, the
    /// question, and whether embedding or search failed.
    pub async fn retrieve(&self, question: &str, topic: &str, k: usize) -> Result<Vec<SearchResult>> {
        let vector = self
            .index
            .embed_query(question)
            .await
            .map_err(|e| e.during_query(topic, question, Stage::Embed))?;

        let results = self
            .index
            .search(topic, &vector, k)
            .await
            .map_err(|e| e.during_query(topic, question, Stage::Search))?;

        let found = results.len();
        let kept: Vec<SearchResult> = match self.threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        };

        debug!(topic, found, kept = kept.len(), threshold = ?self.threshold, "retrieved chunks");
        Ok(kept)
    }
}
