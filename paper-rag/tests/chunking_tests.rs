//! Property tests for fixed-size chunking.

use paper_rag::chunking::{Chunker, FixedSizeChunker};
use paper_rag::document::{Chunk, Document};
use proptest::prelude::*;

/// Pages of mixed ASCII and multi-byte text, some possibly empty.
fn arb_pages() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zé漢 .]{0,60}", 0..6)
}

/// `(chunk_size, chunk_overlap)` with `overlap < size`.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

/// Rebuild the document text: the first chunk whole, then every later chunk
/// without its leading overlap.
fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(&chunk.text);
        } else {
            text.extend(chunk.text.chars().skip(overlap));
        }
    }
    text
}

/// Page holding the character at `offset`, computed directly from the pages.
fn page_of(pages: &[String], offset: usize) -> u32 {
    let mut end = 0;
    for (i, page) in pages.iter().enumerate() {
        end += page.chars().count();
        if offset < end {
            return i as u32 + 1;
        }
    }
    pages.len() as u32
}

mod prop_chunking {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_reconstruct_the_text(pages in arb_pages(), (size, overlap) in arb_sizes()) {
            let document = Document::with_id("doc", "paper.pdf", pages);
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&document);

            prop_assert_eq!(reconstruct(&chunks, overlap), document.text());
            prop_assert_eq!(chunks.len(), chunker.expected_chunks(document.char_count()));
        }

        #[test]
        fn chunks_respect_size_and_overlap(pages in arb_pages(), (size, overlap) in arb_sizes()) {
            let document = Document::with_id("doc", "paper.pdf", pages);
            let chunks = FixedSizeChunker::new(size, overlap).unwrap().chunk(&document);

            for chunk in &chunks {
                prop_assert!(chunk.char_len() <= size);
                prop_assert!(chunk.char_len() > 0);
            }
            for pair in chunks.windows(2) {
                let tail: String = pair[0].text.chars().skip(pair[0].char_len() - overlap).collect();
                let head: String = pair[1].text.chars().take(overlap).collect();
                prop_assert_eq!(tail, head);
                prop_assert_eq!(pair[1].start_offset - pair[0].start_offset, size - overlap);
            }
        }

        #[test]
        fn chunks_carry_page_of_first_character(pages in arb_pages(), (size, overlap) in arb_sizes()) {
            let document = Document::with_id("doc", "paper.pdf", pages.clone());
            let chunks = FixedSizeChunker::new(size, overlap).unwrap().chunk(&document);

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.page, page_of(&pages, chunk.start_offset));
                prop_assert_eq!(chunk.chunk_index, i);
                prop_assert_eq!(&chunk.id, &format!("doc_{i}"));
                prop_assert!(chunk.embedding.is_empty());
            }
        }
    }
}

#[test]
fn three_page_paper_yields_four_chunks() {
    let pages = vec!["a".repeat(1000), "b".repeat(1000), "c".repeat(1000)];
    let document = Document::with_id("doc", "study.pdf", pages);
    let chunks = FixedSizeChunker::new(1000, 200).unwrap().chunk(&document);

    let starts: Vec<(usize, u32)> = chunks.iter().map(|c| (c.start_offset, c.page)).collect();
    assert_eq!(starts, vec![(0, 1), (800, 1), (1600, 2), (2400, 3)]);
    assert_eq!(chunks[3].char_len(), 600);
}

#[test]
fn text_shorter_than_overlap_is_one_chunk() {
    let document = Document::with_id("doc", "short.pdf", vec!["tiny".into()]);
    let chunks = FixedSizeChunker::new(1000, 200).unwrap().chunk(&document);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "tiny");
}
