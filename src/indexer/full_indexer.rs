use super::{FileProcessor, FileWalker};
use crate::config::IndexingConfig;
use crate::error::{IndexingError, RagError, VectorDbError};
use crate::types::{IndexStatus, ReindexReport};
use crate::vector_db::{VectorStore, table_name_for_repo};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Rebuilds a repository's table from its working copy
///
/// The table is dropped and recreated unconditionally, so nothing from earlier
/// incremental runs survives.
pub struct FullIndexer {
    processor: FileProcessor,
    tracked_extensions: Vec<String>,
    max_file_size: usize,
    exclude_patterns: Vec<String>,
}

impl FullIndexer {
    pub fn new(processor: FileProcessor, config: &IndexingConfig) -> Self {
        Self {
            processor,
            tracked_extensions: config.tracked_extensions.clone(),
            max_file_size: config.max_file_size,
            exclude_patterns: config.exclude_patterns.clone(),
        }
    }

    pub async fn reindex(
        &self,
        repo_url: &str,
        local_path: &Path,
        store: &dyn VectorStore,
        cancel: &CancellationToken,
    ) -> Result<ReindexReport, RagError> {
        let start = Instant::now();
        let table_name = table_name_for_repo(repo_url);

        if !local_path.is_dir() {
            return Err(IndexingError::DirectoryNotFound(local_path.display().to_string()).into());
        }
        if cancel.is_cancelled() {
            return Err(IndexingError::Cancelled.into());
        }

        store
            .drop_table(&table_name)
            .await
            .map_err(|e| VectorDbError::DropFailed {
                table: table_name.clone(),
                reason: format!("{:#}", e),
            })?;

        let table = store
            .create_table(&table_name, self.processor.dimension())
            .await
            .map_err(|e| VectorDbError::TableCreationFailed {
                table: table_name.clone(),
                reason: format!("{:#}", e),
            })?;

        let walker = FileWalker::new(local_path, self.max_file_size, self.tracked_extensions.clone())
            .with_exclude_patterns(&self.exclude_patterns)
            .map_err(|e| IndexingError::WalkFailed(format!("{:#}", e)))?
            .with_cancellation(cancel.clone());

        let files = tokio::task::spawn_blocking(move || walker.walk())
            .await
            .map_err(|e| IndexingError::TaskFailed(e.to_string()))?
            .map_err(|e| {
                if cancel.is_cancelled() {
                    IndexingError::Cancelled
                } else {
                    IndexingError::WalkFailed(format!("{:#}", e))
                }
            })?;

        tracing::info!("Reindexing {} files of {} into '{}'", files.len(), repo_url, table_name);

        let outcome = self
            .processor
            .process_files(repo_url, local_path, files, cancel)
            .await?;

        for error in &outcome.errors {
            tracing::warn!("File failed during reindex: {}", error);
        }

        if outcome.is_total_failure() {
            let err = outcome.total_failure();
            tracing::error!("Reindex of {} failed: {}", repo_url, err);
            return Err(err.into());
        }

        let total_chunks = if outcome.chunks.is_empty() {
            0
        } else {
            table
                .add(outcome.chunks)
                .await
                .map_err(|e| VectorDbError::StoreFailed(format!("{:#}", e)))?
        };

        let status = IndexStatus::from_problems(&outcome.errors, &outcome.warnings);
        tracing::info!(
            "Reindexed {}: {} files, {} chunks ({:?})",
            repo_url,
            outcome.files_processed,
            total_chunks,
            status
        );

        Ok(ReindexReport {
            status,
            table_name,
            files_processed: outcome.files_processed,
            total_chunks,
            errors: outcome.errors,
            warnings: outcome.warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{HashEmbedder, RecordingExtractor, TEST_DIMENSION, write_file};
    use crate::vector_db::MemoryVectorStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    const REPO: &str = "https://github.com/Owner/Repo.git";

    fn indexer(extractor: RecordingExtractor, exclude: Vec<String>) -> FullIndexer {
        let config = IndexingConfig {
            exclude_patterns: exclude,
            ..IndexingConfig::default()
        };
        let processor =
            FileProcessor::new(Arc::new(extractor), Arc::new(HashEmbedder::default()), 2);
        FullIndexer::new(processor, &config)
    }

    fn sample_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "app.py", "def main():\n    pass\n");
        write_file(dir.path(), "pkg/models.py", "class User:\n    def save(self):\n        pass\n");
        write_file(dir.path(), "README.md", "# not indexed\n");
        write_file(dir.path(), ".git/hooks/pre-commit.py", "def hook():\n    pass\n");
        dir
    }

    #[tokio::test]
    async fn test_reindex_builds_fresh_table() {
        let dir = sample_repo();
        let store = MemoryVectorStore::new();

        let report = indexer(RecordingExtractor::default(), vec![])
            .reindex(REPO, dir.path(), &store, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.table_name, "owner_repo");
        assert_eq!(report.files_processed, 2);
        assert_eq!(report.total_chunks, 3);
        assert!(report.is_complete());

        let rows = store.table("owner_repo").unwrap().rows().unwrap();
        let ids: Vec<&str> = rows.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["app.py#main#1-2", "pkg/models.py#User#1-3", "pkg/models.py#save#2-3"]
        );
        assert!(rows.iter().all(|c| c.repo_url == REPO));
    }

    #[tokio::test]
    async fn test_reindex_discards_previous_rows() {
        let dir = sample_repo();
        let store = MemoryVectorStore::new();
        let stale = store.create_table("owner_repo", TEST_DIMENSION).await.unwrap();
        stale
            .add(vec![
                crate::types::CodeChunk::new(REPO, "old.py", "gone", "def gone(): pass", 1, 1, vec![0.0; TEST_DIMENSION])
                    .unwrap(),
            ])
            .await
            .unwrap();

        let indexer = indexer(RecordingExtractor::default(), vec!["pkg/**".to_string()]);
        let cancel = CancellationToken::new();
        indexer.reindex(REPO, dir.path(), &store, &cancel).await.unwrap();
        let report = indexer.reindex(REPO, dir.path(), &store, &cancel).await.unwrap();

        assert_eq!(report.total_chunks, 1);
        let rows = store.table("owner_repo").unwrap().rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_path, "app.py");
    }

    #[tokio::test]
    async fn test_reindex_missing_directory() {
        let store = MemoryVectorStore::new();
        let err = indexer(RecordingExtractor::default(), vec![])
            .reindex(REPO, Path::new("/nonexistent/review-index/repo"), &store, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Indexing(IndexingError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_reindex_total_failure() {
        let dir = sample_repo();
        let store = MemoryVectorStore::new();
        let extractor = RecordingExtractor {
            fail_paths: vec!["app.py".to_string(), "pkg/models.py".to_string()],
            ..Default::default()
        };

        let err = indexer(extractor, vec![])
            .reindex(REPO, dir.path(), &store, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_total_failure());
        // the recreated table is left empty rather than half-written
        assert_eq!(store.table("owner_repo").unwrap().rows().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_reindex_empty_repository() {
        let dir = TempDir::new().unwrap();
        let store = MemoryVectorStore::new();

        let report = indexer(RecordingExtractor::default(), vec![])
            .reindex(REPO, dir.path(), &store, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.total_chunks, 0);
        assert_eq!(report.files_processed, 0);
        assert!(store.table("owner_repo").is_some());
    }
}
