//! Text generation trait for producing answers from a grounding prompt.

use async_trait::async_trait;

use crate::error::Result;

/// A stateless text generator: one prompt in, one completion out.
///
/// The pipeline calls [`generate`](TextGenerator::generate) at most once per
/// question and never retries. Implementations should report failures as
/// [`RagError::GenerationError`](crate::RagError::GenerationError).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str {
        "unknown"
    }
}
