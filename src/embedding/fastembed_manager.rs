use super::EmbeddingProvider;
use anyhow::{Context, Result, anyhow, bail};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// FastEmbed-based embedding provider (all-MiniLM-L6-v2 by default)
///
/// The model needs `&mut` access to embed, so calls are serialised through a mutex.
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

/// Map a configured model name onto a FastEmbed model and its output dimension
fn model_for_name(name: &str) -> Result<(EmbeddingModel, usize)> {
    let name = name.strip_prefix("sentence-transformers/").unwrap_or(name);
    let name = name.strip_prefix("BAAI/").unwrap_or(name);

    Ok(match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
        "all-minilm-l12-v2" => (EmbeddingModel::AllMiniLML12V2, 384),
        "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
        "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
        other => bail!("Unsupported embedding model '{}'", other),
    })
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::from_model_name("all-MiniLM-L6-v2")
    }

    /// Create a manager from a configured model name such as `BAAI/bge-small-en-v1.5`
    pub fn from_model_name(name: &str) -> Result<Self> {
        let (model, dimension) = model_for_name(name)?;

        tracing::info!("Initializing FastEmbed model: {:?}", model);

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = true;

        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            model_name: name.to_string(),
        })
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow!("Embedding model lock poisoned: {}", e))?;
        let embeddings = model
            .embed(texts, None)
            .context("Failed to generate embeddings")?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
