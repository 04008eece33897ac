//! Data types for documents, chunks, search results, and answers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded paper: its filename and the text extracted from each page.
///
/// Pages are stored in order; page numbers are 1-based positions in
/// [`pages`](Document::pages). A document is never mutated after ingestion:
/// uploading the same file again produces a new `Document` with a new id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The original filename, used for citations.
    pub filename: String,
    /// Extracted text of each page, in page order.
    pub pages: Vec<String>,
    /// When the document was created.
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    /// Create a document with a fresh UUID.
    pub fn new(filename: impl Into<String>, pages: Vec<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), filename, pages)
    }

    /// Create a document with a caller-supplied id.
    pub fn with_id(id: impl Into<String>, filename: impl Into<String>, pages: Vec<String>) -> Self {
        Self { id: id.into(), filename: filename.into(), pages, ingested_at: Utc::now() }
    }

    /// The page texts concatenated in order, with nothing inserted between pages.
    pub fn text(&self) -> String {
        self.pages.concat()
    }

    /// Total length of the document text in characters.
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.chars().count()).sum()
    }

    /// Whether the document has no extractable text at all.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.is_empty())
    }
}

/// A contiguous slice of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{chunk_index}`.
    pub id: String,
    /// Position of this chunk within its document.
    pub chunk_index: usize,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Filename of the parent document.
    pub filename: String,
    /// Topic the chunk was indexed under. Empty until indexed.
    #[serde(default)]
    pub topic: String,
    /// 1-based page on which the chunk's first character falls.
    pub page: u32,
    /// Character offset of the chunk's first character in the document text.
    pub start_offset: usize,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until indexed.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Length of the chunk text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// A pointer from an answer back to a page of a source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Citation {
    /// Internal id of the cited document.
    pub document_id: String,
    /// Filename of the cited document.
    pub filename: String,
    /// 1-based page number.
    pub page: u32,
}

/// A passage that was placed in the prompt, as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcePassage {
    /// 1-based position in the prompt (the `[n]` label the model saw).
    pub number: usize,
    /// Internal id of the source document.
    pub document_id: String,
    /// Filename of the source document.
    pub filename: String,
    /// 1-based page number.
    pub page: u32,
    /// Similarity score from retrieval.
    pub score: f32,
    /// Leading characters of the passage text.
    pub preview: String,
}

/// A generated answer plus the citations that ground it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The answer text.
    pub text: String,
    /// Deduplicated citations, ordered by retrieval rank.
    pub citations: Vec<Citation>,
    /// The passages included in the prompt, in rank order.
    pub sources: Vec<SourcePassage>,
    /// False when no relevant passage was found and no model was called.
    pub grounded: bool,
}

impl Answer {
    /// Text of the canned answer returned when retrieval finds nothing.
    pub const INSUFFICIENT_INFORMATION: &'static str =
        "I could not find relevant information in the uploaded papers to answer this question.";

    /// The canned answer for an empty retrieval result.
    pub fn insufficient_information() -> Self {
        Self {
            text: Self::INSUFFICIENT_INFORMATION.to_string(),
            citations: Vec::new(),
            sources: Vec::new(),
            grounded: false,
        }
    }

    /// Human-readable labels for each citation, in order.
    ///
    /// Labels read `filename, page N`. When distinct documents share a
    /// filename, their labels also carry the first 8 characters of the
    /// document id so the reader can tell them apart.
    pub fn citation_labels(&self) -> Vec<String> {
        let mut ids_per_filename: HashMap<&str, Vec<&str>> = HashMap::new();
        for citation in &self.citations {
            let ids = ids_per_filename.entry(citation.filename.as_str()).or_default();
            if !ids.contains(&citation.document_id.as_str()) {
                ids.push(citation.document_id.as_str());
            }
        }

        self.citations
            .iter()
            .map(|c| {
                let ambiguous = ids_per_filename
                    .get(c.filename.as_str())
                    .is_some_and(|ids| ids.len() > 1);
                if ambiguous {
                    let short: String = c.document_id.chars().take(8).collect();
                    format!("{} [{short}], page {}", c.filename, c.page)
                } else {
                    format!("{}, page {}", c.filename, c.page)
                }
            })
            .collect()
    }
}
