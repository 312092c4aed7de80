use super::ChunkExtractor;
use crate::embedding::EmbeddingProvider;
use crate::error::{IndexingError, RagError};
use crate::types::CodeChunk;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Chunks, errors and warnings collected from a set of files
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Every chunk produced, in input file order
    pub chunks: Vec<CodeChunk>,
    /// Files that were read and chunked (possibly yielding zero chunks)
    pub files_processed: usize,
    /// One entry per failed file
    pub errors: Vec<String>,
    /// Missing files and individual chunks that could not be embedded
    pub warnings: Vec<String>,
}

impl BatchOutcome {
    /// Every file failed and nothing was produced
    pub fn is_total_failure(&self) -> bool {
        self.chunks.is_empty() && !self.errors.is_empty() && self.files_processed == 0
    }

    pub(crate) fn total_failure(&self) -> IndexingError {
        IndexingError::TotalFailure {
            failed_files: self.errors.len(),
            causes: super::first_causes(&self.errors),
        }
    }
}

enum FileOutcome {
    Processed {
        chunks: Vec<CodeChunk>,
        warnings: Vec<String>,
    },
    Skipped(String),
    Failed {
        error: String,
        warnings: Vec<String>,
    },
}

/// Per-file read, extract and embed step shared by incremental and full indexing
///
/// Files are processed concurrently up to `max_parallel`; results are collected
/// before anything is written so callers can issue one batch insert.
#[derive(Clone)]
pub struct FileProcessor {
    extractor: Arc<dyn ChunkExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    max_parallel: usize,
}

impl FileProcessor {
    pub fn new(
        extractor: Arc<dyn ChunkExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        max_parallel: usize,
    ) -> Self {
        Self {
            extractor,
            embedder,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Vector dimension of the embedder
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Process `paths` (relative to `root`) into chunks for `repo_url`
    ///
    /// Only cancellation aborts the batch; every other problem is recorded
    /// against its file and the rest continue.
    pub async fn process_files(
        &self,
        repo_url: &str,
        root: &Path,
        paths: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, RagError> {
        let outcomes: Vec<FileOutcome> = stream::iter(paths)
            .map(|path| self.process_file(repo_url, root, path, cancel))
            .buffered(self.max_parallel)
            .try_collect()
            .await?;

        let mut batch = BatchOutcome::default();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Processed { chunks, warnings } => {
                    batch.files_processed += 1;
                    batch.chunks.extend(chunks);
                    batch.warnings.extend(warnings);
                }
                FileOutcome::Skipped(warning) => batch.warnings.push(warning),
                FileOutcome::Failed { error, warnings } => {
                    batch.errors.push(error);
                    batch.warnings.extend(warnings);
                }
            }
        }

        Ok(batch)
    }

    async fn process_file(
        &self,
        repo_url: &str,
        root: &Path,
        path: String,
        cancel: &CancellationToken,
    ) -> Result<FileOutcome, RagError> {
        if cancel.is_cancelled() {
            return Err(IndexingError::Cancelled.into());
        }

        let content = match tokio::fs::read(root.join(&path)).await {
            Ok(bytes) => decode_source(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("File {} not found in working copy, skipping", path);
                return Ok(FileOutcome::Skipped(format!("{}: not found in working copy", path)));
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path, e);
                return Ok(FileOutcome::Failed {
                    error: format!("{}: read failed: {}", path, e),
                    warnings: Vec::new(),
                });
            }
        };

        let extractor = self.extractor.clone();
        let embedder = self.embedder.clone();
        let repo_url = repo_url.to_string();
        let task_path = path.clone();
        let task_cancel = cancel.clone();

        let handle = tokio::task::spawn_blocking(move || {
            chunk_file(
                extractor.as_ref(),
                embedder.as_ref(),
                &repo_url,
                &task_path,
                &content,
                &task_cancel,
            )
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Processing task for {} failed: {}", path, e);
                Ok(FileOutcome::Failed {
                    error: format!("{}: {}", path, IndexingError::TaskFailed(e.to_string())),
                    warnings: Vec::new(),
                })
            }
        }
    }
}

/// Decode file contents as UTF-8, dropping any invalid byte sequences
///
/// Line structure is preserved, so chunk line numbers still match the file.
fn decode_source(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Extract and embed one file; blocking
fn chunk_file(
    extractor: &dyn ChunkExtractor,
    embedder: &dyn EmbeddingProvider,
    repo_url: &str,
    path: &str,
    content: &str,
    cancel: &CancellationToken,
) -> Result<FileOutcome, RagError> {
    let extracted = match extractor.extract(path, content) {
        Ok(extracted) => extracted,
        Err(e) => {
            tracing::warn!("Chunk extraction failed for {}: {:#}", path, e);
            return Ok(FileOutcome::Failed {
                error: format!("{}: extraction failed: {:#}", path, e),
                warnings: Vec::new(),
            });
        }
    };

    let total = extracted.len();
    let mut chunks = Vec::with_capacity(total);
    let mut warnings = Vec::new();

    for (index, chunk) in extracted.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(IndexingError::Cancelled.into());
        }

        let built = embedder
            .embed(&chunk.code)
            .map_err(|e| format!("{:#}", e))
            .and_then(|embedding| {
                CodeChunk::new(
                    repo_url,
                    path,
                    &chunk.name,
                    chunk.code,
                    chunk.start_line,
                    chunk.end_line,
                    embedding,
                )
                .map_err(|e| e.to_string())
            });

        match built {
            Ok(code_chunk) => chunks.push(code_chunk),
            Err(reason) => {
                tracing::warn!(
                    "Skipping chunk {} of {} ({}) in {}: {}",
                    index + 1,
                    total,
                    chunk.name,
                    path,
                    reason
                );
                warnings.push(format!(
                    "{}: chunk {} ({}) skipped: {}",
                    path,
                    index + 1,
                    chunk.name,
                    reason
                ));
            }
        }
    }

    if total > 0 && chunks.is_empty() {
        return Ok(FileOutcome::Failed {
            error: format!("{}: all {} chunks failed to embed", path, total),
            warnings,
        });
    }

    tracing::debug!("Produced {} chunks for {}", chunks.len(), path);
    Ok(FileOutcome::Processed { chunks, warnings })
}
