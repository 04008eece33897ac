//! Subcommand handlers. Results go to stdout, diagnostics to the log.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use paper_rag::{RagPipeline, Upload};
use tracing::error;

use crate::staging;

pub async fn topics(pipeline: &RagPipeline) -> Result<()> {
    let topics = pipeline.list_topics().await?;
    if topics.is_empty() {
        println!("No topics yet. Create one with `paper-rag create <topic>`.");
        return Ok(());
    }
    for topic in topics {
        match pipeline.topic_info(&topic).await? {
            Some(info) => println!("{topic} ({} chunks)", info.entries),
            None => println!("{topic}"),
        }
    }
    Ok(())
}

pub async fn create(pipeline: &RagPipeline, topic: &str) -> Result<()> {
    pipeline.create_topic(topic).await?;
    println!("Topic '{topic}' is ready.");
    Ok(())
}

pub async fn delete(pipeline: &RagPipeline, uploads: &Path, topic: &str) -> Result<()> {
    if !pipeline.topic_exists(topic).await? {
        println!("No topic named '{topic}'.");
        return Ok(());
    }
    pipeline.delete_topic(topic).await?;
    staging::remove_topic(uploads, topic).await?;
    println!("Deleted topic '{topic}'.");
    Ok(())
}

pub async fn ingest(
    pipeline: &RagPipeline,
    uploads: &Path,
    topic: &str,
    files: &[PathBuf],
) -> Result<()> {
    // Claims the topic's staging directory before anything is written to it.
    pipeline.create_topic(topic).await?;

    let mut batch = Vec::with_capacity(files.len());
    let mut failures = 0;
    for path in files {
        match staging::stage(uploads, topic, path).await {
            Ok((filename, bytes)) => batch.push(Upload::new(filename, bytes)),
            Err(e) => {
                error!(path = %path.display(), error = %e, "could not stage upload");
                println!("✗ {}: {e:#}", path.display());
                failures += 1;
            }
        }
    }

    let report = pipeline.ingest_batch(topic, batch).await?;
    for ingested in &report.ingested {
        println!(
            "✓ {} ({} pages, {} chunks)",
            ingested.document.filename,
            ingested.document.pages.len(),
            ingested.chunk_count
        );
    }
    for (filename, e) in &report.failed {
        println!("✗ {filename}: {}", e.root());
    }
    failures += report.failed.len();

    println!(
        "Ingested {} of {} files into '{topic}' ({} chunks).",
        report.ingested.len(),
        files.len(),
        report.chunk_count()
    );
    if failures > 0 {
        bail!("{failures} file(s) failed to ingest");
    }
    Ok(())
}

pub async fn ask(pipeline: &RagPipeline, topic: &str, question: &str) -> Result<()> {
    let answer = pipeline.ask(topic, question).await?;
    println!("{}", answer.text);

    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!(
                "  [{}] {}, page {} (score {:.3})",
                source.number, source.filename, source.page, source.score
            );
        }
    }
    if !answer.citations.is_empty() {
        println!("\nCited:");
        for label in answer.citation_labels() {
            println!("  - {label}");
        }
    }
    Ok(())
}

pub async fn search(pipeline: &RagPipeline, topic: &str, question: &str, k: usize) -> Result<()> {
    let results = pipeline.relevant_chunks(topic, question, k).await?;
    if results.is_empty() {
        println!("No relevant passages in '{topic}'.");
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        let chunk = &result.chunk;
        println!("[{}] {}, page {} (score {:.3})", i + 1, chunk.filename, chunk.page, result.score);
        println!("{}\n", chunk.text.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use paper_rag::{FileVectorStore, GeminiClient, PlainTextExtractor, RagConfig};

    use super::*;

    /// A file-backed pipeline. Blank uploads never reach the Gemini client.
    async fn file_pipeline(index_dir: &Path) -> RagPipeline {
        let config = RagConfig::default();
        let gemini = Arc::new(GeminiClient::new("test-key", &config).unwrap());
        let store = FileVectorStore::open(index_dir).await.unwrap();
        RagPipeline::builder()
            .config(config)
            .embedding_provider(gemini.clone())
            .generator(gemini)
            .vector_store(Arc::new(store))
            .extractor(Arc::new(PlainTextExtractor))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn topics_sharing_a_directory_cannot_mix_uploads() {
        let index = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let sources = tempfile::tempdir().unwrap();
        let first = sources.path().join("first.txt");
        let second = sources.path().join("second.txt");
        std::fs::write(&first, b"").unwrap();
        std::fs::write(&second, b"").unwrap();
        let pipeline = file_pipeline(index.path()).await;

        ingest(&pipeline, uploads.path(), "ML Health", std::slice::from_ref(&first))
            .await
            .unwrap();
        assert!(ingest(&pipeline, uploads.path(), "ML_Health", &[second]).await.is_err());

        let staged = staging::topic_dir(uploads.path(), "ML Health");
        assert!(staged.join("first.txt").exists());
        assert!(!staged.join("second.txt").exists());

        delete(&pipeline, uploads.path(), "ML_Health").await.unwrap();
        assert!(staged.join("first.txt").exists());

        delete(&pipeline, uploads.path(), "ML Health").await.unwrap();
        assert!(!staged.exists());
        assert!(pipeline.list_topics().await.unwrap().is_empty());
    }
}
