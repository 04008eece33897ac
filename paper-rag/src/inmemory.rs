//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` of per-topic collections, each behind its own
//! `tokio::sync::RwLock`. It is suitable for development, testing, and
//! small-scale use cases.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::collection::Collection;
use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, VectorStore};

const BACKEND: &str = "InMemory";

/// Collection name → that collection's lock.
pub(crate) type CollectionMap = RwLock<HashMap<String, Arc<RwLock<Collection>>>>;

/// An in-memory vector store using cosine similarity for search.
///
/// The outer lock only guards which collections exist; it is held briefly.
/// Each collection has a dedicated lock, so upserts to one topic are
/// serialized while searches on it, and all operations on other topics,
/// proceed independently.
///
/// # Example
///
/// ```rust,ignore
/// use paper_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384, "models/embedding-001").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: CollectionMap,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Look up the lock for a collection without holding the outer map lock.
pub(crate) async fn collection_handle(
    collections: &CollectionMap,
    name: &str,
) -> Option<Arc<RwLock<Collection>>> {
    collections.read().await.get(name).cloned()
}

pub(crate) fn missing_collection(backend: &str, name: &str) -> RagError {
    RagError::VectorStoreError {
        backend: backend.to_string(),
        message: format!("collection '{name}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        embedding_model: &str,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_insert_with(|| {
            Arc::new(RwLock::new(Collection::new(name, dimensions, embedding_model)))
        });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let removed = self.collections.write().await.remove(name);
        if let Some(collection) = removed {
            collection.write().await.deleted = true;
        }
        Ok(())
    }

    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        match collection_handle(&self.collections, name).await {
            Some(collection) => Ok(Some(collection.read().await.info())),
            None => Ok(None),
        }
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let handle = collection_handle(&self.collections, collection)
            .await
            .ok_or_else(|| missing_collection(BACKEND, collection))?;
        handle.write().await.upsert(BACKEND, chunks)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        match collection_handle(&self.collections, collection).await {
            Some(handle) => handle.read().await.search(BACKEND, embedding, top_k),
            None => Ok(Vec::new()),
        }
    }
}
