//! Shared fixtures for the end-to-end tests

#![allow(dead_code)]

use git2::{IndexAddOption, Repository, Signature};
use review_index::config::Config;
use review_index::embedding::EmbeddingProvider;
use review_index::indexer::PythonChunkExtractor;
use review_index::vector_db::MemoryVectorStore;
use review_index::ReviewIndexClient;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const DIMENSION: usize = 16;

/// Deterministic embedder: byte histogram folded into `DIMENSION` buckets
pub struct FakeEmbedder;

impl EmbeddingProvider for FakeEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; DIMENSION];
                for byte in text.bytes() {
                    vector[byte as usize % DIMENSION] += 1.0;
                }
                let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt().max(1.0);
                vector.into_iter().map(|v| v / norm).collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

/// A source repository to clone from plus scratch space for the client
pub struct Fixture {
    pub scratch: TempDir,
    pub source: Repository,
    pub source_path: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let source_path = scratch.path().join("upstream").join("acme").join("widgets");
        std::fs::create_dir_all(&source_path).unwrap();
        let source = Repository::init(&source_path).unwrap();

        Self {
            scratch,
            source,
            source_path,
        }
    }

    /// URL the client clones from
    pub fn repo_url(&self) -> String {
        self.source_path.to_string_lossy().into_owned()
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.source_path.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.source_path.join(rel)).unwrap();
    }

    /// Stage everything (including deletions) and commit; returns the commit SHA
    pub fn commit(&self, message: &str) -> String {
        let mut index = self.source.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();

        let tree = self.source.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = self.source.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.source
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
            .to_string()
    }

    pub fn clone_dir(&self) -> PathBuf {
        self.scratch.path().join("clones")
    }

    pub fn client(&self) -> ReviewIndexClient {
        let mut config = Config::default();
        config.vector_db.backend = "memory".to_string();
        config.indexing.repo_clone_dir = self.clone_dir();
        config.indexing.lock_dir = self.scratch.path().join("locks");
        config.indexing.max_parallel_files = 2;
        config.retrieval.limit = 3;

        ReviewIndexClient::with_components(
            config,
            Arc::new(FakeEmbedder),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(PythonChunkExtractor::new()),
        )
    }
}

/// `(file_path, id)` of every row in the repository's table, sorted
pub async fn stored_rows(client: &ReviewIndexClient, repo_url: &str) -> Vec<(String, String)> {
    let name = review_index::vector_db::table_name_for_repo(repo_url);
    let Some(table) = client.store().open_table(&name).await.unwrap() else {
        return Vec::new();
    };

    let everything = table
        .search(vec![0.0; DIMENSION], None, usize::MAX)
        .await
        .unwrap();
    let mut rows: Vec<(String, String)> = everything
        .into_iter()
        .map(|c| (c.file_path, c.id))
        .collect();
    rows.sort();
    rows
}
