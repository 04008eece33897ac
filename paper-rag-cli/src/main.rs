//! `paper-rag`: ask questions about research papers grouped into topics.
//!
//! Requires: `GOOGLE_API_KEY` in the environment or a `.env` file.
//!
//! ```text
//! paper-rag create ML-Health
//! paper-rag ingest ML-Health papers/*.pdf
//! paper-rag ask ML-Health "Which models were evaluated?"
//! ```

mod commands;
mod staging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paper_rag::{
    FileVectorStore, GeminiClient, PdfExtractor, PlainTextExtractor, RagConfig, RagPipeline,
    TextExtractor,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "paper-rag", about = "Question answering over research papers, with citations", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List topics
    Topics,

    /// Create a topic
    Create {
        /// Topic name
        topic: String,
    },

    /// Delete a topic, its index and its staged uploads
    Delete {
        /// Topic name
        topic: String,
    },

    /// Upload papers into a topic
    Ingest {
        /// Topic name (created if missing)
        topic: String,
        /// PDF or plain text files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask a question and print the answer with its sources
    Ask {
        /// Topic name
        topic: String,
        /// The question
        question: String,
    },

    /// Show the passages most relevant to a question, without generating an answer
    Search {
        /// Topic name
        topic: String,
        /// The question
        question: String,
        /// Maximum passages (default: TOP_K)
        #[arg(short, long)]
        k: Option<usize>,
    },
}

/// Reads PDFs with `lopdf` and anything else as UTF-8 text.
struct UploadExtractor;

impl TextExtractor for UploadExtractor {
    fn extract(&self, bytes: &[u8]) -> paper_rag::Result<Vec<String>> {
        if bytes.starts_with(b"%PDF") {
            PdfExtractor.extract(bytes)
        } else {
            PlainTextExtractor.extract(bytes)
        }
    }
}

async fn build_pipeline(config: RagConfig) -> Result<RagPipeline> {
    let store = FileVectorStore::open(&config.vector_db_path)
        .await
        .with_context(|| format!("opening vector store at {}", config.vector_db_path.display()))?;
    let gemini = Arc::new(GeminiClient::from_env(&config)?);

    Ok(RagPipeline::builder()
        .config(config)
        .embedding_provider(gemini.clone())
        .generator(gemini)
        .vector_store(Arc::new(store))
        .extractor(Arc::new(UploadExtractor))
        .build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RagConfig::from_env()?;
    let uploads = config.uploads_path.clone();
    let pipeline = build_pipeline(config).await?;

    match cli.command {
        Command::Topics => commands::topics(&pipeline).await,
        Command::Create { topic } => commands::create(&pipeline, &topic).await,
        Command::Delete { topic } => commands::delete(&pipeline, &uploads, &topic).await,
        Command::Ingest { topic, files } => {
            commands::ingest(&pipeline, &uploads, &topic, &files).await
        }
        Command::Ask { topic, question } => commands::ask(&pipeline, &topic, &question).await,
        Command::Search { topic, question, k } => {
            let k = k.unwrap_or(pipeline.config().top_k);
            commands::search(&pipeline, &topic, &question, k).await
        }
    }
}
