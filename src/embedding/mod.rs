mod fastembed_manager;

pub use fastembed_manager::FastEmbedManager;

use anyhow::{Context, Result};

/// Trait for embedding generation
///
/// Implementations are blocking; async callers run them on `spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of text
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Generate the embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(vec![text.to_string()])?
            .into_iter()
            .next()
            .context("Embedding model returned no vector")
    }

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}
