//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use crate::error::Result;

/// Trait for generating text embeddings
///
/// The same provider configuration must be used to build an index and to
/// query it; vectors from different models are not comparable.
///
/// Implementations:
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text, mxbai-embed-large, ...)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text, such as a sentence window or a question
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning vectors in input order
    ///
    /// Fails as a whole if any single text fails. The default embeds one
    /// text at a time.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used; recorded alongside persisted indexes
    fn model(&self) -> &str;
}
