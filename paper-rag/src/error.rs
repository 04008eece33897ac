//! Error types for the `paper-rag` crate.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The pipeline step at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Text extraction from the uploaded bytes.
    Extract,
    /// Calling the embedding provider.
    Embed,
    /// Writing entries to the vector store.
    Store,
    /// Similarity search against the vector store.
    Search,
    /// Calling the text generator.
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Embed => "embed",
            Stage::Store => "store",
            Stage::Search => "search",
            Stage::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or missing configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating an answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An external call did not complete within the configured timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// The operation that timed out (`embed`, `generate`, ...).
        operation: String,
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Text could not be extracted from an uploaded file.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// A topic name was rejected.
    #[error("Invalid topic name: {0:?}")]
    InvalidTopic(String),

    /// A failure while ingesting one document, with its context.
    #[error("ingest of '{document}' into topic '{topic}' failed at {stage}: {source}")]
    Ingest {
        /// Topic the document was being ingested into.
        topic: String,
        /// Document id, or filename when the id was not yet assigned.
        document: String,
        /// Pipeline step that failed.
        stage: Stage,
        /// The underlying error.
        #[source]
        source: Box<RagError>,
    },

    /// A failure while answering a question, with its context.
    #[error("question {question:?} on topic '{topic}' failed at {stage}: {source}")]
    Query {
        /// Topic the question was asked against.
        topic: String,
        /// The question text.
        question: String,
        /// Pipeline step that failed.
        stage: Stage,
        /// The underlying error.
        #[source]
        source: Box<RagError>,
    },

    /// File system failure in a persistent store.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failure.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Wrap this error with ingest context.
    pub fn during_ingest(
        self,
        topic: impl Into<String>,
        document: impl Into<String>,
        stage: Stage,
    ) -> Self {
        RagError::Ingest {
            topic: topic.into(),
            document: document.into(),
            stage,
            source: Box::new(self),
        }
    }

    /// Wrap this error with query context.
    pub fn during_query(
        self,
        topic: impl Into<String>,
        question: impl Into<String>,
        stage: Stage,
    ) -> Self {
        RagError::Query {
            topic: topic.into(),
            question: question.into(),
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context wrappers peeled off.
    pub fn root(&self) -> &RagError {
        match self {
            RagError::Ingest { source, .. } | RagError::Query { source, .. } => source.root(),
            other => other,
        }
    }

    /// The stage recorded by the outermost context wrapper, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RagError::Ingest { stage, .. } | RagError::Query { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether a caller may reasonably retry the operation.
    ///
    /// Only external-call failures qualify. The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            RagError::EmbeddingError { .. }
                | RagError::GenerationError { .. }
                | RagError::Timeout { .. }
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_peels_context_wrappers() {
        let err = RagError::EmbeddingError { provider: "fake".into(), message: "503".into() }
            .during_query("ML-Health", "what is x?", Stage::Embed);

        assert_eq!(err.stage(), Some(Stage::Embed));
        assert!(matches!(err.root(), RagError::EmbeddingError { .. }));
        assert!(err.is_retryable());

        let msg = err.to_string();
        assert!(msg.contains("ML-Health"));
        assert!(msg.contains("what is x?"));
        assert!(msg.contains("embed"));
    }

    #[test]
    fn config_errors_are_not_retryable() {
        let err = RagError::ConfigError("bad".into()).during_ingest("t", "doc", Stage::Extract);
        assert!(!err.is_retryable());
    }
}
