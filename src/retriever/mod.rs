//! Review context retrieval
//!
//! Embeds a diff fragment and looks up the closest chunks from *other* files of
//! the same repository, for use as prompt context when reviewing that file.

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, IndexingError, RagError, VectorDbError};
use crate::types::CodeChunk;
use crate::vector_db::{Column, Filter, VectorStore, table_name_for_repo};
use std::fmt::Write;
use std::sync::Arc;

const NO_SNIPPETS: &str = "No relevant code snippets found in the existing codebase.";

/// Read-only similarity search over a repository's table
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Chunks most similar to `query_text`, excluding those from `file_path`
    ///
    /// A repository without a table yields an empty result. Results keep the
    /// store's ranking, closest first.
    pub async fn retrieve(
        &self,
        repo_url: &str,
        file_path: &str,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<CodeChunk>, RagError> {
        let table_name = table_name_for_repo(repo_url);

        let table = self
            .store
            .open_table(&table_name)
            .await
            .map_err(|e| VectorDbError::OpenFailed {
                table: table_name.clone(),
                reason: format!("{:#}", e),
            })?;
        let Some(table) = table else {
            tracing::warn!("Table '{}' not found, skipping retrieval", table_name);
            return Ok(Vec::new());
        };

        if limit == 0 {
            return Ok(Vec::new());
        }

        let embedder = self.embedder.clone();
        let query = query_text.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&query))
            .await
            .map_err(|e| IndexingError::TaskFailed(e.to_string()))?
            .map_err(|e| EmbeddingError::GenerationFailed(format!("{:#}", e)))?;

        let exclude_current = Filter::ne(Column::FilePath, file_path);
        let chunks = table
            .search(vector, Some(&exclude_current), limit)
            .await
            .map_err(|e| VectorDbError::SearchFailed(format!("{:#}", e)))?;

        tracing::info!(
            "Retrieved {} context chunks for {} in {}",
            chunks.len(),
            file_path,
            repo_url
        );
        Ok(chunks)
    }
}

/// Render retrieved chunks as a prompt-ready block
pub fn format_context(chunks: &[CodeChunk]) -> String {
    if chunks.is_empty() {
        return NO_SNIPPETS.to_string();
    }

    let mut context = String::from("\n--- Relevant Code Snippets from the Codebase ---\n");
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = write!(
            context,
            "\nSnippet {}: From file `{}` (Lines {}-{})\n```python\n{}\n```\n",
            i + 1,
            chunk.file_path,
            chunk.start_line,
            chunk.end_line,
            chunk.content
        );
    }
    context.push_str("--- End of Snippets ---\n");
    context
}
