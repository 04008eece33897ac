//! # paper-rag
//!
//! Topic-scoped retrieval-augmented question answering over research papers.
//!
//! Papers are uploaded into named topics. Their text is split into
//! overlapping page-tagged chunks, embedded, and stored one collection per
//! topic. A question is embedded with the same model, the most similar chunks
//! of its topic are retrieved, and a single generation call answers from
//! those chunks only. Every answer carries citations to the source file and
//! page of the passages it was grounded on.
//!
//! ## Feature flags
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `gemini` | [`GeminiClient`](gemini::GeminiClient) for embeddings and generation |
//! | `pdf` | [`PdfExtractor`] backed by `lopdf` |
//! | `full` | all of the above |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use paper_rag::{FileVectorStore, RagConfig, RagPipeline};
//!
//! let config = RagConfig::from_env()?;
//! let store = FileVectorStore::open(&config.vector_db_path).await?;
//! let pipeline = RagPipeline::builder()
//!     .config(config)
//!     .embedding_provider(embedder)
//!     .generator(generator)
//!     .vector_store(Arc::new(store))
//!     .build()?;
//!
//! pipeline.ingest_document("ML-Health", "study.txt", bytes).await?;
//! let answer = pipeline.ask("ML-Health", "What was the reported accuracy?").await?;
//! for label in answer.citation_labels() {
//!     println!("{label}");
//! }
//! ```

pub mod chunking;
mod collection;
pub mod composer;
pub mod config;
mod deadline;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod file_store;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;

pub use chunking::{Chunker, FixedSizeChunker};
pub use composer::AnswerComposer;
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, Citation, Document, SearchResult, SourcePassage};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result, Stage};
#[cfg(feature = "pdf")]
pub use extract::PdfExtractor;
pub use extract::{PlainTextExtractor, TextExtractor};
pub use file_store::FileVectorStore;
pub use generation::TextGenerator;
pub use index::TopicIndex;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{BatchReport, IngestedDocument, RagPipeline, RagPipelineBuilder, Upload};
pub use retriever::Retriever;
pub use vectorstore::{CollectionInfo, VectorStore};

#[cfg(feature = "gemini")]
pub use gemini::GeminiClient;
