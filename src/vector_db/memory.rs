//! In-process vector store
//!
//! Exact L2 search over rows held in memory. Shares the trait semantics of the
//! LanceDB backend, so it backs `vector_db.backend = "memory"` and the test suites.

use super::{ChunkTable, Filter, VectorStore};
use crate::types::CodeChunk;
use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct MemoryVectorStore {
    tables: RwLock<BTreeMap<String, Arc<MemoryChunkTable>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle to a table, for inspecting stored rows
    pub fn table(&self, name: &str) -> Option<Arc<MemoryChunkTable>> {
        self.tables.read().ok()?.get(name).cloned()
    }
}

pub struct MemoryChunkTable {
    name: String,
    dimension: usize,
    rows: RwLock<Vec<CodeChunk>>,
}

impl MemoryChunkTable {
    /// Snapshot of all rows in insertion order
    pub fn rows(&self) -> Result<Vec<CodeChunk>> {
        Ok(self
            .rows
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock on table rows: {}", e))?
            .clone())
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[async_trait::async_trait]
impl VectorStore for MemoryVectorStore {
    async fn table_names(&self) -> Result<Vec<String>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock on tables: {}", e))?;
        Ok(tables.keys().cloned().collect())
    }

    async fn open_table(&self, name: &str) -> Result<Option<Arc<dyn ChunkTable>>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock on tables: {}", e))?;
        Ok(tables
            .get(name)
            .map(|t| t.clone() as Arc<dyn ChunkTable>))
    }

    async fn create_table(&self, name: &str, dimension: usize) -> Result<Arc<dyn ChunkTable>> {
        if dimension == 0 {
            bail!("Vector dimension must be greater than 0");
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock on tables: {}", e))?;
        if tables.contains_key(name) {
            bail!("Table '{}' already exists", name);
        }

        let table = Arc::new(MemoryChunkTable {
            name: name.to_string(),
            dimension,
            rows: RwLock::new(Vec::new()),
        });
        tables.insert(name.to_string(), table.clone());
        tracing::debug!("Created in-memory table '{}' (dimension {})", name, dimension);
        Ok(table)
    }

    async fn drop_table(&self, name: &str) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock on tables: {}", e))?;
        if tables.remove(name).is_none() {
            tracing::debug!("Table '{}' did not exist, nothing to drop", name);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChunkTable for MemoryChunkTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, chunks: Vec<CodeChunk>) -> Result<usize> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != self.dimension) {
            bail!(
                "Chunk '{}' has dimension {}, table '{}' expects {}",
                bad.id,
                bad.embedding.len(),
                self.name,
                self.dimension
            );
        }

        let count = chunks.len();
        self.rows
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock on table rows: {}", e))?
            .extend(chunks);
        Ok(count)
    }

    async fn delete(&self, filter: &Filter) -> Result<()> {
        self.rows
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock on table rows: {}", e))?
            .retain(|chunk| !filter.matches(chunk));
        Ok(())
    }

    async fn count_rows(&self, filter: Option<&Filter>) -> Result<usize> {
        let rows = self
            .rows
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock on table rows: {}", e))?;
        Ok(match filter {
            Some(filter) => rows.iter().filter(|c| filter.matches(c)).count(),
            None => rows.len(),
        })
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<CodeChunk>> {
        if vector.len() != self.dimension {
            bail!(
                "Query has dimension {}, table '{}' expects {}",
                vector.len(),
                self.name,
                self.dimension
            );
        }

        let rows = self
            .rows
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock on table rows: {}", e))?;

        let mut scored: Vec<(f32, &CodeChunk)> = rows
            .iter()
            .filter(|c| filter.is_none_or(|f| f.matches(c)))
            .map(|c| (l2_distance(&vector, &c.embedding), c))
            .collect();
        // Stable sort keeps insertion order for equal distances
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }
}
