//! Core library client for review-index
//!
//! [`ReviewIndexClient`] ties the pieces together for the three things a review
//! bot does: build a repository's index from scratch, keep it in sync as pushes
//! arrive, and gather context for each file of a pull request diff.

mod repo_lock;

pub use repo_lock::RepoLockGuard;

use crate::config::Config;
use crate::diff::{FileDiff, parse_diff};
use crate::embedding::{EmbeddingProvider, FastEmbedManager};
use crate::error::{EmbeddingError, GitError, IndexingError, RagError, VectorDbError};
use crate::git::{ChangeSetDetector, GitRepository};
use crate::indexer::{ChunkExtractor, ChunkSync, FileProcessor, FullIndexer, PythonChunkExtractor};
use crate::retriever::{Retriever, format_context};
use crate::types::{ChangeSet, CodeChunk, ReindexReport, SyncReport};
use crate::vector_db::{self, ChunkTable, VectorStore, table_name_for_repo};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

/// Context gathered for one file of a pull request diff
#[derive(Debug, Clone, Serialize)]
pub struct FileReviewContext {
    pub file_diff: FileDiff,
    /// Closest chunks from other files of the repository
    pub chunks: Vec<CodeChunk>,
    /// `chunks` rendered for a prompt
    pub context: String,
}

type RepoLocks = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// A claim on one entry of the in-process lock map
///
/// The entry is removed when the last claim on it goes away.
struct RepoSlot {
    key: String,
    mutex: Option<Arc<tokio::sync::Mutex<()>>>,
    locks: RepoLocks,
}

impl Drop for RepoSlot {
    fn drop(&mut self) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // any other owner of the mutex belongs to a slot still alive
        drop(self.mutex.take());
        if locks
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Holds both locks for one repository until dropped
///
/// Fields drop in order: process lock, then local guard, then the map slot.
struct RepoGuard {
    _process: RepoLockGuard,
    _local: OwnedMutexGuard<()>,
    _slot: RepoSlot,
}

/// Main client for indexing repositories and retrieving review context
///
/// Collaborators are injected behind traits so the whole pipeline can run
/// against the in-memory store and a fake embedder.
///
/// # Example
///
/// ```no_run
/// use review_index::{Config, ReviewIndexClient};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = ReviewIndexClient::new(Config::new()?).await?;
///     let report = client
///         .index_repository("https://github.com/acme/widgets.git", &CancellationToken::new())
///         .await?;
///     println!("Indexed {} chunks", report.total_chunks);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ReviewIndexClient {
    config: Arc<Config>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    extractor: Arc<dyn ChunkExtractor>,
    // One async mutex per repository table; operations on the same repository queue
    repo_locks: RepoLocks,
}

impl ReviewIndexClient {
    /// Build the default stack: FastEmbed, the configured vector store and the Python extractor
    pub async fn new(config: Config) -> Result<Self, RagError> {
        tracing::info!("Initializing review-index client");
        tracing::debug!("Vector DB backend: {}", config.vector_db.backend);
        tracing::debug!("Embedding model: {}", config.embedding.model_name);

        let model_name = config.embedding.model_name.clone();
        let embedder = tokio::task::spawn_blocking(move || {
            FastEmbedManager::from_model_name(&model_name)
        })
        .await
        .map_err(|e| IndexingError::TaskFailed(e.to_string()))?
        .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)))?;

        let store = vector_db::connect(&config.vector_db).await?;

        Ok(Self::with_components(
            config,
            Arc::new(embedder),
            store,
            Arc::new(PythonChunkExtractor::new()),
        ))
    }

    /// Build a client from explicit collaborators
    pub fn with_components(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        extractor: Arc<dyn ChunkExtractor>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            embedder,
            store,
            extractor,
            repo_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Working copy location: `{repo_clone_dir}/{owner}/{repo}`
    pub fn local_repo_path(&self, repo_url: &str) -> PathBuf {
        let trimmed = repo_url.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed
            .split(['/', ':'])
            .filter(|s| !s.is_empty())
            .collect();

        let mut path = self.config.indexing.repo_clone_dir.clone();
        let tail = &segments[segments.len().saturating_sub(2)..];
        for (i, segment) in tail.iter().enumerate() {
            let segment = if i + 1 == tail.len() {
                segment.strip_suffix(".git").unwrap_or(segment)
            } else {
                segment
            };
            match segment {
                "" | "." | ".." => path.push("_"),
                other => path.push(other),
            }
        }
        path
    }

    /// Clone or pull the repository, then rebuild its table from the working copy
    pub async fn index_repository(
        &self,
        repo_url: &str,
        cancel: &CancellationToken,
    ) -> Result<ReindexReport, RagError> {
        let _guard = self.lock_repository(repo_url, cancel).await?;

        let local_path = self.local_repo_path(repo_url);
        let url = repo_url.to_string();
        let path = local_path.clone();
        tokio::task::spawn_blocking(move || GitRepository::clone_or_pull(&url, &path))
            .await
            .map_err(|e| IndexingError::TaskFailed(e.to_string()))??;

        let indexer = FullIndexer::new(self.processor(), &self.config.indexing);
        indexer
            .reindex(repo_url, &local_path, self.store.as_ref(), cancel)
            .await
    }

    /// Bring the repository's table from `old_commit` to `new_commit`
    ///
    /// An unresolvable commit range is logged and treated as "nothing changed".
    pub async fn index_push(
        &self,
        repo_url: &str,
        old_commit: &str,
        new_commit: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, RagError> {
        let _guard = self.lock_repository(repo_url, cancel).await?;

        let local_path = self.local_repo_path(repo_url);
        let detector = ChangeSetDetector::new(self.config.indexing.tracked_extensions.clone());
        let (url, path) = (repo_url.to_string(), local_path.clone());
        let (old, new) = (old_commit.to_string(), new_commit.to_string());

        // git2 handles are not Sync, so checkout and diff share one blocking task
        let detected = tokio::task::spawn_blocking(move || {
            let repo = GitRepository::clone_or_pull(&url, &path)?;
            Ok::<_, GitError>(detector.detect(&repo, &old, &new))
        })
        .await
        .map_err(|e| IndexingError::TaskFailed(e.to_string()))??;

        let change_set = detected.unwrap_or_else(|e| {
            tracing::error!("{}; nothing will be synchronised", e);
            ChangeSet::default()
        });

        let table = self.open_or_create_table(repo_url).await?;
        ChunkSync::new(self.processor())
            .sync(repo_url, &local_path, &change_set, table.as_ref(), cancel)
            .await
    }

    /// Parse a pull request diff and retrieve context for every file in it
    pub async fn review_context(
        &self,
        repo_url: &str,
        diff_text: &str,
    ) -> Result<Vec<FileReviewContext>, RagError> {
        let retriever = self.retriever();
        let limit = self.config.retrieval.limit;

        let mut contexts = Vec::new();
        for file_diff in parse_diff(diff_text) {
            let chunks = retriever
                .retrieve(repo_url, &file_diff.path, &file_diff.content, limit)
                .await?;
            let context = format_context(&chunks);
            contexts.push(FileReviewContext {
                file_diff,
                chunks,
                context,
            });
        }
        Ok(contexts)
    }

    /// Chunks most similar to `query_text` outside `file_path`
    pub async fn retrieve(
        &self,
        repo_url: &str,
        file_path: &str,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<CodeChunk>, RagError> {
        self.retriever()
            .retrieve(repo_url, file_path, query_text, limit)
            .await
    }

    fn processor(&self) -> FileProcessor {
        FileProcessor::new(
            self.extractor.clone(),
            self.embedder.clone(),
            self.config.indexing.max_parallel_files,
        )
    }

    fn retriever(&self) -> Retriever {
        Retriever::new(self.store.clone(), self.embedder.clone())
    }

    async fn open_or_create_table(&self, repo_url: &str) -> Result<Arc<dyn ChunkTable>, RagError> {
        let table_name = table_name_for_repo(repo_url);

        let existing = self
            .store
            .open_table(&table_name)
            .await
            .map_err(|e| VectorDbError::OpenFailed {
                table: table_name.clone(),
                reason: format!("{:#}", e),
            })?;
        if let Some(table) = existing {
            return Ok(table);
        }

        tracing::info!("Table '{}' does not exist yet, creating it", table_name);
        let table = self
            .store
            .create_table(&table_name, self.embedder.dimension())
            .await
            .map_err(|e| VectorDbError::TableCreationFailed {
                table: table_name.clone(),
                reason: format!("{:#}", e),
            })?;
        Ok(table)
    }

    async fn lock_repository(
        &self,
        repo_url: &str,
        cancel: &CancellationToken,
    ) -> Result<RepoGuard, RagError> {
        let key = table_name_for_repo(repo_url);
        let slot = {
            let mut locks = self
                .repo_locks
                .lock()
                .map_err(|e| GitError::LockFailed(e.to_string()))?;
            let mutex = locks.entry(key.clone()).or_default().clone();
            RepoSlot {
                key,
                mutex: Some(mutex),
                locks: self.repo_locks.clone(),
            }
        };
        let mutex = slot
            .mutex
            .clone()
            .ok_or_else(|| GitError::LockFailed("repository slot already released".to_string()))?;

        let local = tokio::select! {
            guard = mutex.lock_owned() => guard,
            _ = cancel.cancelled() => return Err(IndexingError::Cancelled.into()),
        };
        let process =
            RepoLockGuard::acquire(&self.config.indexing.lock_dir, repo_url, cancel).await?;

        Ok(RepoGuard {
            _process: process,
            _local: local,
            _slot: slot,
        })
    }
}

#[cfg(test)]
mod tests;
