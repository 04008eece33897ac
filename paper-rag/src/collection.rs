//! Brute-force cosine-similarity collection shared by the store backends.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::CollectionInfo;

/// One topic's entries, keyed by chunk id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Collection {
    pub(crate) name: String,
    pub(crate) dimensions: usize,
    pub(crate) embedding_model: String,
    entries: HashMap<String, Chunk>,
    /// Set when the collection is dropped while a writer still holds it.
    #[serde(skip)]
    pub(crate) deleted: bool,
}

impl Collection {
    pub(crate) fn new(name: &str, dimensions: usize, embedding_model: &str) -> Self {
        Self {
            name: name.to_string(),
            dimensions,
            embedding_model: embedding_model.to_string(),
            entries: HashMap::new(),
            deleted: false,
        }
    }

    pub(crate) fn info(&self) -> CollectionInfo {
        CollectionInfo {
            name: self.name.clone(),
            dimensions: self.dimensions,
            embedding_model: self.embedding_model.clone(),
            entries: self.entries.len(),
        }
    }

    /// Insert or overwrite entries. Nothing is written if any vector has the
    /// wrong dimensionality.
    pub(crate) fn upsert(&mut self, backend: &str, chunks: &[Chunk]) -> Result<()> {
        if self.deleted {
            return Err(RagError::VectorStoreError {
                backend: backend.to_string(),
                message: format!("collection '{}' was deleted", self.name),
            });
        }
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != self.dimensions) {
            return Err(RagError::VectorStoreError {
                backend: backend.to_string(),
                message: format!(
                    "chunk '{}' has {} dimensions, collection '{}' expects {}",
                    bad.id,
                    bad.embedding.len(),
                    self.name,
                    self.dimensions
                ),
            });
        }
        for chunk in chunks {
            self.entries.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    pub(crate) fn search(
        &self,
        backend: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if embedding.len() != self.dimensions {
            return Err(RagError::VectorStoreError {
                backend: backend.to_string(),
                message: format!(
                    "query has {} dimensions, collection '{}' expects {}",
                    embedding.len(),
                    self.name,
                    self.dimensions
                ),
            });
        }

        let mut scored: Vec<SearchResult> = self
            .entries
            .values()
            .map(|chunk| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(&chunk.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a * norm_b);
    if score.is_nan() { 0.0 } else { score }
}
