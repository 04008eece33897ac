//! File-backed vector store.
//!
//! [`FileVectorStore`] keeps the same per-topic collections as
//! [`InMemoryVectorStore`](crate::InMemoryVectorStore) and persists each one
//! as a JSON snapshot under a root directory. Snapshots are rewritten after
//! every mutation through a temporary file and an atomic rename, so a crash
//! leaves either the old or the new snapshot on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::collection::Collection;
use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::inmemory::{CollectionMap, collection_handle, missing_collection};
use crate::vectorstore::{CollectionInfo, VectorStore};

const BACKEND: &str = "File";
const SNAPSHOT_EXT: &str = "json";

/// A [`VectorStore`] persisted as one JSON file per collection.
///
/// Collection file names are derived from the collection name: lowercased,
/// with every character other than ASCII letters and digits replaced by
/// `_`. Two names that map to the same file cannot coexist.
///
/// # Example
///
/// ```rust,ignore
/// use paper_rag::FileVectorStore;
///
/// let store = FileVectorStore::open("./data/vector_db").await?;
/// ```
#[derive(Debug)]
pub struct FileVectorStore {
    root: PathBuf,
    collections: CollectionMap,
}

impl FileVectorStore {
    /// Open (or create) a store rooted at `root`, loading every snapshot in it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the directory cannot be created or read,
    /// and [`RagError::VectorStoreError`] if a snapshot cannot be parsed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        let mut collections = HashMap::new();
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            let bytes = fs::read(&path).await?;
            let collection: Collection = serde_json::from_slice(&bytes).map_err(|e| {
                RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!("corrupt snapshot {}: {e}", path.display()),
                }
            })?;
            debug!(collection = %collection.name, path = %path.display(), "loaded collection");
            collections.insert(collection.name.clone(), Arc::new(RwLock::new(collection)));
        }

        info!(root = %root.display(), collections = collections.len(), "opened file vector store");
        Ok(Self { root, collections: RwLock::new(collections) })
    }

    /// The directory holding the snapshots.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{SNAPSHOT_EXT}", file_stem(name)))
    }

    async fn persist(&self, collection: &Collection) -> Result<()> {
        let path = self.snapshot_path(&collection.name);
        let tmp = path.with_extension(format!("{SNAPSHOT_EXT}.tmp"));
        let bytes = serde_json::to_vec(collection)?;
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            fs::remove_file(&tmp).await.ok();
            warn!(collection = %collection.name, path = %path.display(), error = %e, "failed to persist collection");
            return Err(e.into());
        }
        debug!(collection = %collection.name, path = %path.display(), "persisted collection");
        Ok(())
    }
}

/// File name stem for a collection name.
///
/// Lowercases ASCII letters and digits and replaces everything else with `_`.
pub fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        embedding_model: &str,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Ok(());
        }
        let stem = file_stem(name);
        if let Some(other) = collections.keys().find(|existing| file_stem(existing) == stem) {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("collection '{name}' would share a file with '{other}'"),
            });
        }

        let collection = Collection::new(name, dimensions, embedding_model);
        self.persist(&collection).await?;
        collections.insert(name.to_string(), Arc::new(RwLock::new(collection)));
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let Some(handle) = collections.get(name).cloned() else {
            return Ok(());
        };
        let mut collection = handle.write().await;

        // The snapshot goes first: a failed removal leaves the topic intact.
        match fs::remove_file(self.snapshot_path(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(collection = name, error = %e, "failed to remove snapshot");
                return Err(e.into());
            }
        }
        collection.deleted = true;
        collections.remove(name);
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
        let mut guard = handle.write().await;

        // Persist the updated copy before publishing it, so a failed write
        // leaves the searchable state unchanged.
        let mut updated = guard.clone();
        updated.upsert(BACKEND, chunks)?;
        self.persist(&updated).await?;
        *guard = updated;
        Ok(())
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
