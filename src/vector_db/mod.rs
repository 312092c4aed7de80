// LanceDB is the default embedded vector database (no server required)
pub mod lance_client;
pub use lance_client::LanceVectorStore;

// In-process backend for tests and throwaway runs
pub mod memory;
pub use memory::MemoryVectorStore;

/// Structured row filters rendered per backend
pub mod filter;
pub use filter::{Column, Filter};

use crate::config::VectorDbConfig;
use crate::error::{RagError, VectorDbError};
use crate::types::CodeChunk;
use anyhow::Result;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// A collection of per-repository chunk tables
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all tables in the store
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Open an existing table, `None` if it does not exist
    async fn open_table(&self, name: &str) -> Result<Option<Arc<dyn ChunkTable>>>;

    /// Create an empty table for vectors of `dimension` floats
    async fn create_table(&self, name: &str, dimension: usize) -> Result<Arc<dyn ChunkTable>>;

    /// Drop a table; dropping a missing table is not an error
    async fn drop_table(&self, name: &str) -> Result<()>;
}

/// One repository's chunk rows
#[async_trait::async_trait]
pub trait ChunkTable: Send + Sync {
    fn name(&self) -> &str;

    /// Insert rows in a single write, returning the number inserted
    async fn add(&self, chunks: Vec<CodeChunk>) -> Result<usize>;

    /// Delete all rows matching `filter`
    async fn delete(&self, filter: &Filter) -> Result<()>;

    /// Count rows, optionally restricted to those matching `filter`
    async fn count_rows(&self, filter: Option<&Filter>) -> Result<usize>;

    /// Nearest rows to `vector`, closest first
    async fn search(
        &self,
        vector: Vec<f32>,
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<CodeChunk>>;
}

/// Open the backend selected by `config.backend`
pub async fn connect(config: &VectorDbConfig) -> Result<Arc<dyn VectorStore>, RagError> {
    match config.backend.as_str() {
        "lancedb" => {
            let path = config.lancedb_path.to_string_lossy();
            let store = LanceVectorStore::with_path(&path)
                .await
                .map_err(|e| VectorDbError::ConnectionFailed(format!("{:#}", e)))?;
            Ok(Arc::new(store))
        }
        "memory" => {
            tracing::info!("Using in-memory vector store; nothing will be persisted");
            Ok(Arc::new(MemoryVectorStore::new()))
        }
        other => Err(VectorDbError::ConnectionFailed(format!("unknown backend '{}'", other)).into()),
    }
}

static UNSAFE_TABLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_.\-]").expect("static regex"));

/// Stable table name for a repository URL: `owner_repo`, lower-cased
///
/// Works for `https://host/owner/repo(.git)`, `git@host:owner/repo.git` and local paths.
pub fn table_name_for_repo(repo_url: &str) -> String {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let segments: Vec<&str> = trimmed
        .split(['/', ':'])
        .filter(|s| !s.is_empty())
        .collect();
    let tail = &segments[segments.len().saturating_sub(2)..];

    let joined = tail.join("/");
    let joined = joined.strip_suffix(".git").unwrap_or(&joined);
    let lowered = joined.to_lowercase().replace('/', "_");

    UNSAFE_TABLE_CHARS.replace_all(&lowered, "_").into_owned()
}
