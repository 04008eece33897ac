//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] is the caller-facing surface of the crate. It wires a
//! [`TextExtractor`], a [`Chunker`], a [`TopicIndex`], a [`Retriever`] and an
//! [`AnswerComposer`] together and exposes topic management, ingestion and
//! question answering.
//!
//! # Example
//!
//! ```rust,ignore
//! use paper_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generator(Arc::new(my_generator))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.create_topic("ML-Health").await?;
//! pipeline.ingest_document("ML-Health", "study.pdf", bytes).await?;
//! let answer = pipeline.ask("ML-Health", "What was the accuracy?").await?;
//! ```

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::composer::AnswerComposer;
use crate::config::RagConfig;
use crate::document::{Answer, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};
use crate::extract::{PlainTextExtractor, TextExtractor};
use crate::generation::TextGenerator;
use crate::index::TopicIndex;
use crate::retriever::Retriever;
use crate::vectorstore::{CollectionInfo, VectorStore};

/// A file handed to [`RagPipeline::ingest_batch`].
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original filename, kept for citations.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Create an upload from a filename and its contents.
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { filename: filename.into(), bytes: bytes.into() }
    }
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    /// The stored document, with its assigned id.
    pub document: Document,
    /// Number of chunks indexed. Zero when the document had no text.
    pub chunk_count: usize,
}

/// Outcome of [`RagPipeline::ingest_batch`].
///
/// Documents succeed or fail independently; one failure never prevents the
/// others from being indexed.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Documents that were indexed, in upload order.
    pub ingested: Vec<IngestedDocument>,
    /// Filenames that failed, with the error for each, in upload order.
    pub failed: Vec<(String, RagError)>,
}

impl BatchReport {
    /// Whether every document in the batch was ingested.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of chunks indexed across the batch.
    pub fn chunk_count(&self) -> usize {
        self.ingested.iter().map(|d| d.chunk_count).sum()
    }
}

/// The RAG pipeline orchestrator.
///
/// Coordinates ingestion (extract → chunk → embed → store) and question
/// answering (embed → search → filter → generate). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    extractor: Arc<dyn TextExtractor>,
    chunker: Arc<dyn Chunker>,
    index: Arc<TopicIndex>,
    retriever: Retriever,
    composer: AnswerComposer,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        self.index.embedder()
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        self.index.store()
    }

    /// Return a reference to the topic index.
    pub fn index(&self) -> &Arc<TopicIndex> {
        &self.index
    }

    /// Create a topic. No-op if it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidTopic`] for a blank name, or the store's
    /// error if the collection cannot be created.
    pub async fn create_topic(&self, name: &str) -> Result<()> {
        validate_topic(name)?;
        self.index.ensure_topic(name).await.map_err(|e| {
            error!(topic = name, error = %e, "failed to create topic");
            e
        })?;
        info!(topic = name, "topic ready");
        Ok(())
    }

    /// Delete a topic and every chunk indexed under it. No-op if it does not exist.
    pub async fn delete_topic(&self, name: &str) -> Result<()> {
        validate_topic(name)?;
        self.vector_store().delete_collection(name).await.map_err(|e| {
            error!(topic = name, error = %e, "failed to delete topic");
            e
        })?;
        info!(topic = name, "deleted topic");
        Ok(())
    }

    /// Whether a topic with this name exists.
    pub async fn topic_exists(&self, name: &str) -> Result<bool> {
        Ok(self.vector_store().collection_info(name).await?.is_some())
    }

    /// Describe a topic, or `None` if it does not exist.
    pub async fn topic_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        self.vector_store().collection_info(name).await
    }

    /// Names of all topics, sorted.
    pub async fn list_topics(&self) -> Result<Vec<String>> {
        self.vector_store().list_collections().await
    }

    /// Ingest one uploaded file into `topic`: extract → chunk → embed → store.
    ///
    /// The topic is created on first use. A file without extractable text is
    /// ingested with zero chunks and a warning rather than an error.
    ///
    /// # Errors
    ///
    /// Failures are wrapped in [`RagError::Ingest`] naming the topic, the
    /// document, and the failing stage.
    pub async fn ingest_document(
        &self,
        topic: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestedDocument> {
        validate_topic(topic)?;

        let extractor = Arc::clone(&self.extractor);
        let pages = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| RagError::ExtractionError(format!("extraction task failed: {e}")))
            .and_then(|extracted| extracted)
            .map_err(|e| {
                error!(topic, filename, error = %e, "text extraction failed");
                e.during_ingest(topic, filename, Stage::Extract)
            })?;

        self.ingest_pages(topic, Document::new(filename, pages)).await
    }

    /// Ingest a document whose page texts were already extracted.
    pub async fn ingest_pages(&self, topic: &str, document: Document) -> Result<IngestedDocument> {
        validate_topic(topic)?;

        self.index
            .ensure_topic(topic)
            .await
            .map_err(|e| e.during_ingest(topic, &document.id, Stage::Store))?;

        let mut chunks = self.chunker.chunk(&document);
        if chunks.is_empty() {
            warn!(
                topic,
                document.id = %document.id,
                filename = %document.filename,
                "no extractable text, ingested with zero chunks"
            );
            return Ok(IngestedDocument { document, chunk_count: 0 });
        }

        self.index.embed(&mut chunks).await.map_err(|e| {
            error!(topic, document.id = %document.id, error = %e, "embedding failed during ingestion");
            e.during_ingest(topic, &document.id, Stage::Embed)
        })?;

        self.index.store_chunks(topic, &mut chunks).await.map_err(|e| {
            error!(topic, document.id = %document.id, error = %e, "upsert failed during ingestion");
            e.during_ingest(topic, &document.id, Stage::Store)
        })?;

        let chunk_count = chunks.len();
        info!(topic, document.id = %document.id, filename = %document.filename, chunk_count, "ingested document");

        Ok(IngestedDocument { document, chunk_count })
    }

    /// Ingest several uploads into `topic` concurrently.
    ///
    /// Each document is processed independently: failures are collected in
    /// [`BatchReport::failed`] and never abort the rest of the batch.
    ///
    /// # Errors
    ///
    /// Only a blank topic name fails the whole call.
    pub async fn ingest_batch(&self, topic: &str, uploads: Vec<Upload>) -> Result<BatchReport> {
        validate_topic(topic)?;

        let outcomes = join_all(uploads.into_iter().map(|upload| async move {
            let result = self.ingest_document(topic, &upload.filename, upload.bytes).await;
            (upload.filename, result)
        }))
        .await;

        let mut report = BatchReport::default();
        for (filename, outcome) in outcomes {
            match outcome {
                Ok(ingested) => report.ingested.push(ingested),
                Err(e) => report.failed.push((filename, e)),
            }
        }

        info!(
            topic,
            ingested = report.ingested.len(),
            failed = report.failed.len(),
            chunk_count = report.chunk_count(),
            "batch ingest completed"
        );
        Ok(report)
    }

    /// Answer `question` from the papers in `topic`, with citations.
    ///
    /// Retrieves the configured `top_k` chunks, drops those below the
    /// similarity threshold, and generates one answer. When nothing relevant
    /// is found (including an empty or unknown topic) the canned
    /// [`Answer::insufficient_information`] is returned.
    ///
    /// # Errors
    ///
    /// Failures are wrapped in [`RagError::Query`] naming the topic, the
    /// question, and the failing stage. Nothing is retried.
    pub async fn ask(&self, topic: &str, question: &str) -> Result<Answer> {
        validate_topic(topic)?;

        let retrieved = self.retriever.retrieve(question, topic, self.config.top_k).await.map_err(|e| {
            error!(topic, error = %e, "retrieval failed");
            e
        })?;

        let answer = self.composer.compose(question, &retrieved).await.map_err(|e| {
            error!(topic, error = %e, "answer generation failed");
            e.during_query(topic, question, Stage::Generate)
        })?;

        info!(
            topic,
            passages = retrieved.len(),
            citations = answer.citations.len(),
            grounded = answer.grounded,
            "answered question"
        );
        Ok(answer)
    }

    /// The chunks of `topic` most relevant to `question`, without generating
    /// an answer.
    pub async fn relevant_chunks(
        &self,
        topic: &str,
        question: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        validate_topic(topic)?;
        self.retriever.retrieve(question, topic, k).await
    }
}

fn validate_topic(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RagError::InvalidTopic(name.to_string()));
    }
    Ok(())
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider`, `generator` and `vector_store` are
/// required. The chunker defaults to a [`FixedSizeChunker`] sized from the
/// config, and the extractor to [`PlainTextExtractor`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(config)
///     .embedding_provider(Arc::new(embedder))
///     .generator(Arc::new(generator))
///     .vector_store(Arc::new(store))
///     .extractor(Arc::new(PdfExtractor))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn TextGenerator>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the text generator used to compose answers.
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Replace the default document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Replace the default text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing or
    /// the configured chunk sizes are invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::from_config(&config)?),
        };
        let extractor = self.extractor.unwrap_or_else(|| Arc::new(PlainTextExtractor));

        let index =
            Arc::new(TopicIndex::new(embedding_provider, vector_store, config.request_timeout));
        let retriever = Retriever::new(Arc::clone(&index), config.similarity_threshold);
        let composer = AnswerComposer::new(generator, config.request_timeout);

        Ok(RagPipeline { config, extractor, chunker, index, retriever, composer })
    }
}
