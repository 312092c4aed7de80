//! Deterministic collaborators for unit tests

use crate::embedding::EmbeddingProvider;
use crate::indexer::{ChunkExtractor, PythonChunkExtractor};
use crate::types::{CodeChunk, ExtractedChunk};
use crate::vector_db::{ChunkTable, Filter};
use anyhow::{Result, bail};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const TEST_DIMENSION: usize = 8;

/// Bag-of-bytes embedder; fails for any text containing one of `fail_markers`
#[derive(Default)]
pub struct HashEmbedder {
    pub fail_markers: Vec<String>,
}

impl HashEmbedder {
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            fail_markers: markers.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                if let Some(marker) = self.fail_markers.iter().find(|m| text.contains(m.as_str())) {
                    bail!("model unavailable for text containing '{}'", marker);
                }
                let mut vector = vec![0.0f32; TEST_DIMENSION];
                for (i, byte) in text.bytes().enumerate() {
                    vector[(byte as usize + i) % TEST_DIMENSION] += 1.0;
                }
                let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt().max(1.0);
                Ok(vector.into_iter().map(|v| v / norm).collect())
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }

    fn model_name(&self) -> &str {
        "hash-test"
    }
}

/// Python extractor that records which files it was asked to chunk
#[derive(Default)]
pub struct RecordingExtractor {
    pub seen: Mutex<Vec<String>>,
    pub fail_paths: Vec<String>,
}

impl ChunkExtractor for RecordingExtractor {
    fn extract(&self, file_path: &str, content: &str) -> Result<Vec<ExtractedChunk>> {
        self.seen.lock().unwrap().push(file_path.to_string());
        if self.fail_paths.iter().any(|p| p == file_path) {
            bail!("extractor crashed on {}", file_path);
        }
        PythonChunkExtractor::new().extract(file_path, content)
    }
}

/// Table wrapper that records delete filters and can be told to fail writes
pub struct RecordingTable {
    pub inner: Arc<dyn ChunkTable>,
    pub deletes: Mutex<Vec<Filter>>,
    pub adds: Mutex<Vec<usize>>,
    pub fail_delete: bool,
    pub fail_count: bool,
}

impl RecordingTable {
    pub fn new(inner: Arc<dyn ChunkTable>) -> Self {
        Self {
            inner,
            deletes: Mutex::new(Vec::new()),
            adds: Mutex::new(Vec::new()),
            fail_delete: false,
            fail_count: false,
        }
    }
}

#[async_trait::async_trait]
impl ChunkTable for RecordingTable {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn add(&self, chunks: Vec<CodeChunk>) -> Result<usize> {
        self.adds.lock().unwrap().push(chunks.len());
        self.inner.add(chunks).await
    }

    async fn delete(&self, filter: &Filter) -> Result<()> {
        self.deletes.lock().unwrap().push(filter.clone());
        if self.fail_delete {
            bail!("store unreachable");
        }
        self.inner.delete(filter).await
    }

    async fn count_rows(&self, filter: Option<&Filter>) -> Result<usize> {
        if self.fail_count {
            bail!("count unsupported");
        }
        self.inner.count_rows(filter).await
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<CodeChunk>> {
        self.inner.search(vector, filter, limit).await
    }
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}
