//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], which
//! slides a fixed-size character window with overlap across a document's
//! concatenated page text and tags each window with the page it starts on.

use crate::config::RagConfig;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and page metadata but no
/// embeddings. Embeddings are attached later by the index.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no text.
    /// Each returned chunk has an empty embedding vector and an empty topic.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Windows of `chunk_size` characters advance by `chunk_size - chunk_overlap`
/// until a window reaches the end of the text, so the last chunk may be
/// shorter and every non-final chunk shares exactly `chunk_overlap`
/// characters with its successor. A chunk's page is the page holding its
/// first character, even when the window runs on into the next page.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`.
///
/// # Example
///
/// ```rust,ignore
/// use paper_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the sizes in a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Maximum number of characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Number of chunks a text of `char_count` characters splits into.
    pub fn expected_chunks(&self, char_count: usize) -> usize {
        if char_count == 0 {
            return 0;
        }
        if char_count <= self.chunk_overlap {
            return 1;
        }
        let step = self.chunk_size - self.chunk_overlap;
        (char_count - self.chunk_overlap).div_ceil(step)
    }
}

/// Maps character offsets in the concatenated text back to page numbers.
struct PageMap {
    /// `(first char offset, 1-based page number)` for every non-empty page.
    starts: Vec<(usize, u32)>,
}

impl PageMap {
    fn new(pages: &[String]) -> Self {
        let mut starts = Vec::with_capacity(pages.len());
        let mut offset = 0;
        for (i, page) in pages.iter().enumerate() {
            let len = page.chars().count();
            if len > 0 {
                starts.push((offset, i as u32 + 1));
            }
            offset += len;
        }
        Self { starts }
    }

    /// Page containing the character at `offset`.
    fn page_at(&self, offset: usize) -> u32 {
        let idx = self.starts.partition_point(|(start, _)| *start <= offset);
        // idx >= 1 whenever offset lies inside the text: the first non-empty
        // page always starts at 0.
        self.starts.get(idx.saturating_sub(1)).map_or(1, |(_, page)| *page)
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = document.text();
        if text.is_empty() {
            return Vec::new();
        }

        // Byte position of every char boundary, plus the end of the text.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        boundaries.push(text.len());
        let total = boundaries.len() - 1;

        let pages = PageMap::new(&document.pages);
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::with_capacity(self.expected_chunks(total));
        let mut start = 0;
        let mut chunk_index = 0;

        loop {
            let end = (start + self.chunk_size).min(total);

            chunks.push(Chunk {
                id: format!("{}_{chunk_index}", document.id),
                chunk_index,
                document_id: document.id.clone(),
                filename: document.filename.clone(),
                topic: String::new(),
                page: pages.page_at(start),
                start_offset: start,
                text: text[boundaries[start]..boundaries[end]].to_string(),
                embedding: Vec::new(),
            });

            if end == total {
                break;
            }
            start += step;
            chunk_index += 1;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pages: &[&str]) -> Document {
        Document::with_id("doc", "paper.pdf", pages.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(FixedSizeChunker::new(10, 10), Err(RagError::ConfigError(_))));
        assert!(matches!(FixedSizeChunker::new(10, 11), Err(RagError::ConfigError(_))));
        assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::ConfigError(_))));
        assert!(FixedSizeChunker::new(10, 0).is_ok());
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunker = FixedSizeChunker::new(10, 2).unwrap();
        assert!(chunker.chunk(&doc(&[])).is_empty());
        assert!(chunker.chunk(&doc(&["", ""])).is_empty());
    }

    #[test]
    fn windows_overlap_and_last_is_shorter() {
        let chunker = FixedSizeChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk(&doc(&["abcdefghij"]));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        assert_eq!(chunks.iter().map(|c| c.start_offset).collect::<Vec<_>>(), vec![0, 3, 6]);
        assert_eq!(chunks[2].id, "doc_2");
    }

    #[test]
    fn no_trailing_window_inside_its_predecessor() {
        let chunker = FixedSizeChunker::new(5, 2).unwrap();
        let chunks = chunker.chunk(&doc(&["abcde"]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunker.expected_chunks(5), 1);
    }

    #[test]
    fn page_is_where_the_window_starts() {
        let chunker = FixedSizeChunker::new(4, 2).unwrap();
        // Page 1 = "aaa", page 2 empty, page 3 = "bbbbb".
        let chunks = chunker.chunk(&doc(&["aaa", "", "bbbbb"]));
        let pages: Vec<(usize, u32)> = chunks.iter().map(|c| (c.start_offset, c.page)).collect();
        assert_eq!(pages, vec![(0, 1), (2, 1), (4, 3)]);
        assert_eq!(chunks[1].text, "abbb");
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunker = FixedSizeChunker::new(3, 1).unwrap();
        let chunks = chunker.chunk(&doc(&["ééééé"]));
        assert!(chunks.iter().all(|c| c.char_len() <= 3));
        assert_eq!(chunks.len(), chunker.expected_chunks(5));
        assert_eq!(chunks[0].text, "ééé");
    }

    #[test]
    fn expected_chunks_matches_formula() {
        let chunker = FixedSizeChunker::new(1000, 200).unwrap();
        assert_eq!(chunker.expected_chunks(0), 0);
        assert_eq!(chunker.expected_chunks(150), 1);
        assert_eq!(chunker.expected_chunks(1000), 1);
        assert_eq!(chunker.expected_chunks(1001), 2);
        assert_eq!(chunker.expected_chunks(3000), 4);
    }
}
