//! Repository indexing: chunk extraction, file walking and table reconciliation
//!
//! [`PythonChunkExtractor`] turns a source file into symbol-level chunks,
//! [`FileProcessor`] embeds them with bounded per-file concurrency, and the two
//! entry points build on it: [`ChunkSync`] applies a commit-to-commit change set
//! and [`FullIndexer`] rebuilds a repository's table from the working copy.

mod ast_parser;
mod chunk_sync;
mod file_walker;
mod full_indexer;
mod processor;

pub use ast_parser::PythonChunkExtractor;
pub use chunk_sync::ChunkSync;
pub use file_walker::FileWalker;
pub use full_indexer::FullIndexer;
pub use processor::{BatchOutcome, FileProcessor};

use crate::types::ExtractedChunk;
use anyhow::Result;

/// Splits a source file into symbol-level chunks
///
/// Implementations must tolerate syntactically invalid input and return whatever
/// chunks are recoverable; an `Err` is reserved for the extractor itself being unusable.
pub trait ChunkExtractor: Send + Sync {
    fn extract(&self, file_path: &str, content: &str) -> Result<Vec<ExtractedChunk>>;
}

/// Keep at most the first few messages for an aggregated failure
pub(crate) fn first_causes(errors: &[String]) -> Vec<String> {
    errors.iter().take(3).cloned().collect()
}
