//! Property tests for in-memory vector store search.

use std::collections::HashMap;

use paper_rag::document::Chunk;
use paper_rag::inmemory::InMemoryVectorStore;
use paper_rag::vectorstore::VectorStore;
use proptest::prelude::*;

const MODEL: &str = "test-embedding";

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", 1u32..20, arb_normalized_embedding(dim)).prop_map(
        |(id, text, page, embedding)| Chunk {
            id,
            chunk_index: 0,
            document_id: "doc_1".to_string(),
            filename: "paper.pdf".to_string(),
            topic: String::new(),
            page,
            start_offset: 0,
            text,
            embedding,
        },
    )
}

fn dedupe(chunks: &[Chunk]) -> Vec<Chunk> {
    let mut deduped: HashMap<String, Chunk> = HashMap::new();
    for chunk in chunks {
        deduped.entry(chunk.id.clone()).or_insert_with(|| chunk.clone());
    }
    deduped.into_values().collect()
}

/// Searching returns results ordered by descending cosine similarity, and
/// never more than `top_k` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 0usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM, MODEL).await.unwrap();

                let unique_chunks = dedupe(&chunks);
                let count = unique_chunks.len();

                store.upsert("test", &unique_chunks).await.unwrap();
                let results = store.search("test", &query, top_k).await.unwrap();
                (results, count)
            });

            prop_assert_eq!(results.len(), top_k.min(unique_count));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

/// Upserting the same chunks twice leaves the collection as after one upsert.
mod prop_upsert_idempotence {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn repeated_upsert_changes_nothing(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..15),
            query in arb_normalized_embedding(DIM),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let unique_chunks = dedupe(&chunks);
            let (once, twice, entries) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM, MODEL).await.unwrap();

                store.upsert("test", &unique_chunks).await.unwrap();
                let once = store.search("test", &query, 100).await.unwrap();
                store.upsert("test", &unique_chunks).await.unwrap();
                let twice = store.search("test", &query, 100).await.unwrap();
                let info = store.collection_info("test").await.unwrap().unwrap();
                (once, twice, info.entries)
            });

            prop_assert_eq!(entries, unique_chunks.len());
            let ids = |r: &[paper_rag::SearchResult]| r.iter().map(|r| r.chunk.id.clone()).collect::<Vec<_>>();
            prop_assert_eq!(ids(&once), ids(&twice));
        }
    }
}

/// A search in one topic never returns chunks stored under another.
mod prop_topic_isolation {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn search_only_sees_its_own_topic(
            left in proptest::collection::vec(arb_chunk(DIM), 1..10),
            right in proptest::collection::vec(arb_chunk(DIM), 1..10),
            query in arb_normalized_embedding(DIM),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let left: Vec<Chunk> = dedupe(&left)
                .into_iter()
                .map(|mut c| { c.id = format!("left_{}", c.id); c })
                .collect();
            let right: Vec<Chunk> = dedupe(&right)
                .into_iter()
                .map(|mut c| { c.id = format!("right_{}", c.id); c })
                .collect();

            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("left", DIM, MODEL).await.unwrap();
                store.create_collection("right", DIM, MODEL).await.unwrap();
                store.upsert("left", &left).await.unwrap();
                store.upsert("right", &right).await.unwrap();
                store.search("left", &query, 100).await.unwrap()
            });

            prop_assert_eq!(results.len(), left.len());
            prop_assert!(results.iter().all(|r| r.chunk.id.starts_with("left_")));
        }
    }
}

#[tokio::test]
async fn missing_topic_searches_as_empty() {
    let store = InMemoryVectorStore::new();
    let results = store.search("nowhere", &[1.0, 0.0], 5).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let store = InMemoryVectorStore::new();
    store.create_collection("t", 3, MODEL).await.unwrap();
    let chunk = Chunk {
        id: "d_0".into(),
        chunk_index: 0,
        document_id: "d".into(),
        filename: "a.pdf".into(),
        topic: "t".into(),
        page: 1,
        start_offset: 0,
        text: "text".into(),
        embedding: vec![1.0, 0.0],
    };

    let err = store.upsert("t", &[chunk]).await.unwrap_err();
    assert!(matches!(err, paper_rag::RagError::VectorStoreError { .. }));
    assert_eq!(store.collection_info("t").await.unwrap().unwrap().entries, 0);
}
