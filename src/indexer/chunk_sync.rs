use super::FileProcessor;
use crate::error::{IndexingError, RagError, VectorDbError};
use crate::types::{ChangeSet, IndexStatus, SyncReport};
use crate::vector_db::{ChunkTable, Filter};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reconciles a repository table with a change set
///
/// Chunks of deleted and modified files are removed first, then added and
/// modified files are re-chunked and inserted in one batch. Removing before
/// inserting is what keeps shifted line ranges from leaving stale rows behind.
pub struct ChunkSync {
    processor: FileProcessor,
}

impl ChunkSync {
    pub fn new(processor: FileProcessor) -> Self {
        Self { processor }
    }

    pub async fn sync(
        &self,
        repo_url: &str,
        local_path: &Path,
        change_set: &ChangeSet,
        table: &dyn ChunkTable,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, RagError> {
        let start = Instant::now();

        if cancel.is_cancelled() {
            return Err(IndexingError::Cancelled.into());
        }

        // Phase 1: deletion
        let to_delete = change_set.paths_to_delete();
        let mut deleted_count = 0;
        for path in &to_delete {
            let filter = Filter::for_file(repo_url, path);

            let existing = match table.count_rows(Some(&filter)).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!("Could not count chunks for {}: {:#}", path, e);
                    0
                }
            };

            table.delete(&filter).await.map_err(|e| {
                tracing::error!("Failed to delete chunks for {}: {:#}", path, e);
                VectorDbError::DeleteFailed(format!("{}: {:#}", path, e))
            })?;

            tracing::info!("Deleted {} chunks for file: {}", existing, path);
            deleted_count += existing;
        }

        // Added files only own rows when the same sync is re-run
        for path in change_set.added.iter().filter(|p| !to_delete.contains(p)) {
            let filter = Filter::for_file(repo_url, path);
            match table.count_rows(Some(&filter)).await {
                Ok(0) => {}
                Ok(existing) => {
                    table.delete(&filter).await.map_err(|e| {
                        VectorDbError::DeleteFailed(format!("{}: {:#}", path, e))
                    })?;
                    tracing::info!("Replaced {} existing chunks for added file: {}", existing, path);
                    deleted_count += existing;
                }
                Err(e) => tracing::warn!("Could not count chunks for {}: {:#}", path, e),
            }
        }

        // Phase 2: insertion
        let to_index = change_set.paths_to_index();
        let outcome = match self
            .processor
            .process_files(repo_url, local_path, to_index, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                if deleted_count > 0 {
                    tracing::warn!(
                        "Sync of {} aborted after removing {} stale chunks; a full reindex will restore them",
                        repo_url,
                        deleted_count
                    );
                }
                return Err(e);
            }
        };

        for error in &outcome.errors {
            tracing::warn!("File failed during sync: {}", error);
        }

        if outcome.is_total_failure() {
            let err = outcome.total_failure();
            tracing::error!("Sync of {} failed: {}", repo_url, err);
            return Err(err.into());
        }

        let added_count = if outcome.chunks.is_empty() {
            0
        } else {
            table
                .add(outcome.chunks)
                .await
                .map_err(|e| VectorDbError::StoreFailed(format!("{:#}", e)))?
        };

        let status = IndexStatus::from_problems(&outcome.errors, &outcome.warnings);
        tracing::info!(
            "Sync of {} finished: {} chunks deleted, {} added ({:?})",
            repo_url,
            deleted_count,
            added_count,
            status
        );

        Ok(SyncReport {
            status,
            deleted_count,
            added_count,
            files_added: change_set.added.len(),
            files_modified: change_set.modified.len(),
            files_deleted: change_set.deleted.len(),
            errors: outcome.errors,
            warnings: outcome.warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
