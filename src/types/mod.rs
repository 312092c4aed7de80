//! Records shared across the indexing pipeline
//!
//! `CodeChunk` is the row stored in a repository's table, `ExtractedChunk` is what
//! the chunk extractor hands back before embedding, and the report types carry the
//! counts plus a status flag that callers must inspect before treating a run as
//! fully successful.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Symbol-level unit of source code stored in the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// `file_path#symbol_name#start_line-end_line`, unique within one repository table
    pub id: String,
    pub repo_url: String,
    /// Path relative to the repository root
    pub file_path: String,
    pub content: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl CodeChunk {
    /// Build a chunk row, deriving its id from path, symbol name and line range
    pub fn new(
        repo_url: impl Into<String>,
        file_path: impl Into<String>,
        symbol_name: &str,
        content: impl Into<String>,
        start_line: usize,
        end_line: usize,
        embedding: Vec<f32>,
    ) -> Result<Self, ValidationError> {
        let file_path = file_path.into();

        if file_path.is_empty() {
            return Err(ValidationError::Empty("file_path".to_string()));
        }
        if start_line == 0 {
            return Err(ValidationError::ConstraintViolation {
                field: "start_line".to_string(),
                constraint: "at least 1".to_string(),
                actual: start_line.to_string(),
            });
        }
        if end_line < start_line {
            return Err(ValidationError::ConstraintViolation {
                field: "end_line".to_string(),
                constraint: format!("at least start_line ({})", start_line),
                actual: end_line.to_string(),
            });
        }
        if embedding.is_empty() {
            return Err(ValidationError::Empty("embedding".to_string()));
        }

        Ok(Self {
            id: Self::make_id(&file_path, symbol_name, start_line, end_line),
            repo_url: repo_url.into(),
            file_path,
            content: content.into(),
            start_line,
            end_line,
            embedding,
        })
    }

    pub fn make_id(file_path: &str, symbol_name: &str, start_line: usize, end_line: usize) -> String {
        format!("{}#{}#{}-{}", file_path, symbol_name, start_line, end_line)
    }
}

/// Kind of symbol a chunk was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Function,
    Class,
}

/// Chunk produced by the extractor, before embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedChunk {
    pub name: String,
    pub kind: ChunkKind,
    pub code: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// File-level classification of the changes between two commits,
/// restricted to tracked file types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Files whose existing chunks must go: `deleted ∪ modified`
    pub fn paths_to_delete(&self) -> Vec<String> {
        ordered_union(&self.deleted, &self.modified)
    }

    /// Files that must be (re)chunked: `added ∪ modified`
    pub fn paths_to_index(&self) -> Vec<String> {
        ordered_union(&self.added, &self.modified)
    }
}

fn ordered_union(first: &[String], second: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    first
        .iter()
        .chain(second.iter())
        .filter(|p| seen.insert(p.as_str()))
        .cloned()
        .collect()
}

/// Whether a run processed everything it was asked to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    /// Every file and chunk was processed
    Complete,
    /// Some files or chunks were skipped; see `errors` / `warnings`
    Partial,
}

impl IndexStatus {
    pub fn from_problems(errors: &[String], warnings: &[String]) -> Self {
        if errors.is_empty() && warnings.is_empty() {
            IndexStatus::Complete
        } else {
            IndexStatus::Partial
        }
    }
}

/// Result of an incremental synchronisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub status: IndexStatus,
    /// Rows removed for deleted and modified files (best-effort count)
    pub deleted_count: usize,
    /// Rows inserted for added and modified files
    pub added_count: usize,
    pub files_added: usize,
    pub files_modified: usize,
    pub files_deleted: usize,
    /// Per-file failures
    #[serde(default)]
    pub errors: Vec<String>,
    /// Skipped files and chunks that did not fail the file
    #[serde(default)]
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.status == IndexStatus::Complete
    }
}

/// Result of rebuilding a repository table from scratch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexReport {
    pub status: IndexStatus,
    pub table_name: String,
    pub files_processed: usize,
    pub total_chunks: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl ReindexReport {
    pub fn is_complete(&self) -> bool {
        self.status == IndexStatus::Complete
    }
}

#[cfg(test)]
mod tests;
