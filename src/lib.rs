//! # review-index - Repository Code Index for Automated Pull Request Review
//!
//! Keeps a vector index of a repository's code chunks in step with its git
//! history, and turns pull request diffs into per-file review context.
//!
//! ## Overview
//!
//! Python sources are split into function and class chunks with tree-sitter,
//! embedded locally with FastEmbed and stored in one LanceDB table per
//! repository. Pushes are applied incrementally from the commit-to-commit
//! change set; a full rebuild is always available. When a pull request is
//! reviewed, each file's diff is used as the query for the closest chunks in
//! *other* files, and diff positions are computed so review comments can be
//! anchored to added lines.
//!
//! ## Architecture
//!
//! ```text
//!   push (old..new)            pull request diff
//!         │                           │
//!  ┌──────▼────────┐           ┌──────▼──────┐
//!  │ChangeSetDetect│           │ parse_diff  │
//!  └──────┬────────┘           └──────┬──────┘
//!  ┌──────▼──────┐  ┌────────┐ ┌──────▼──────┐
//!  │  ChunkSync  │──► Lance  ◄─┤  Retriever  │
//!  │ FullIndexer │  │ tables │ └─────────────┘
//!  └──────┬──────┘  └────────┘
//!  ┌──────▼──────────────┐
//!  │tree-sitter+FastEmbed│
//!  └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`client`]: [`ReviewIndexClient`], the entry point tying everything together
//! - [`diff`]: unified diff parsing and comment positioning
//! - [`git`]: working copies and change set detection
//! - [`indexer`]: chunk extraction, incremental sync and full reindex
//! - [`retriever`]: similarity search and prompt formatting
//! - [`vector_db`]: vector store abstraction (LanceDB and in-memory)
//! - [`embedding`]: embedding generation using FastEmbed
//! - [`config`]: configuration management with environment variable support
//! - [`types`]: chunk records, change sets and reports
//! - [`error`]: error types
//!
//! ## Usage Example
//!
//! ```no_run
//! use review_index::{Config, ReviewIndexClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ReviewIndexClient::new(Config::new()?).await?;
//!     let diff = std::fs::read_to_string("pr.diff")?;
//!
//!     for file in client
//!         .review_context("https://github.com/acme/widgets.git", &diff)
//!         .await?
//!     {
//!         println!("{}:\n{}", file.file_diff.path, file.context);
//!     }
//!     Ok(())
//! }
//! ```

/// Orchestration of indexing and review context per repository
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Unified diff parsing and review comment positioning
pub mod diff;

/// Embedding generation using FastEmbed (all-MiniLM-L6-v2)
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Git working copies and commit-to-commit change sets
pub mod git;

/// Chunk extraction, incremental sync and full reindex
pub mod indexer;

/// Tracing subscriber setup
pub mod logging;

/// Platform-specific default locations
pub mod paths;

/// Similarity search over a repository's chunks
pub mod retriever;

/// Chunk records, change sets and indexing reports
pub mod types;

/// Vector database abstraction supporting LanceDB and an in-memory store
pub mod vector_db;

#[cfg(test)]
mod test_support;

pub use client::{FileReviewContext, ReviewIndexClient};
pub use config::Config;
pub use diff::{FileDiff, LineComment, PositionedComments, parse_diff, position_comments};
pub use error::RagError;
pub use types::{ChangeSet, CodeChunk, IndexStatus, ReindexReport, SyncReport};
