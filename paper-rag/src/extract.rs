//! Text extraction from uploaded files.
//!
//! Extraction turns raw upload bytes into one text per page. Page order is
//! preserved and pages without text are kept as empty strings, so page
//! numbers in citations stay aligned with the original file.

use crate::error::{RagError, Result};

/// Form feed, the page separator emitted by tools such as `pdftotext`.
pub const PAGE_BREAK: char = '\x0c';

/// Converts raw file bytes into per-page text.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of every page, in page order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ExtractionError`] if the bytes cannot be read as
    /// the expected format.
    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Reads UTF-8 text, splitting pages at form feed characters.
///
/// A single trailing form feed does not start an extra empty page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| RagError::ExtractionError(format!("not valid UTF-8 text: {e}")))?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let text = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
        Ok(text.split(PAGE_BREAK).map(str::to_string).collect())
    }
}

#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;

#[cfg(feature = "pdf")]
mod pdf {
    use tracing::{debug, warn};

    use super::TextExtractor;
    use crate::error::{RagError, Result};

    /// Extracts page text from PDF files with `lopdf`.
    ///
    /// This type is only available when the `pdf` feature is enabled.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PdfExtractor;

    impl TextExtractor for PdfExtractor {
        fn extract(&self, bytes: &[u8]) -> Result<Vec<String>> {
            let document = lopdf::Document::load_mem(bytes)
                .map_err(|e| RagError::ExtractionError(format!("failed to load PDF: {e}")))?;

            let pages = document.get_pages();
            let mut texts = Vec::with_capacity(pages.len());
            for page_number in pages.keys() {
                match document.extract_text(&[*page_number]) {
                    Ok(text) => texts.push(text),
                    Err(e) => {
                        warn!(page = page_number, error = %e, "no extractable text on page");
                        texts.push(String::new());
                    }
                }
            }

            debug!(page_count = texts.len(), "extracted PDF text");
            Ok(texts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_pages_on_form_feed() {
        let pages = PlainTextExtractor.extract(b"one\x0ctwo\x0c\x0cfour\x0c").unwrap();
        assert_eq!(pages, vec!["one", "two", "", "four"]);
    }

    #[test]
    fn empty_input_has_no_pages() {
        assert!(PlainTextExtractor.extract(b"").unwrap().is_empty());
    }

    #[test]
    fn invalid_utf8_is_an_extraction_error() {
        let err = PlainTextExtractor.extract(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, RagError::ExtractionError(_)));
    }
}
