/// Centralized error types for review-index using thiserror
///
/// Collaborator traits (embedder, extractor, VCS, vector store) return `anyhow::Result`;
/// the indexing operations map those failures onto the domain enums below.
use thiserror::Error;

/// Main error type for the indexing and review-context pipeline
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Errors related to vector database operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Failed to connect to vector database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create table '{table}': {reason}")]
    TableCreationFailed { table: String, reason: String },

    #[error("Failed to drop table '{table}': {reason}")]
    DropFailed { table: String, reason: String },

    #[error("Failed to open table '{table}': {reason}")]
    OpenFailed { table: String, reason: String },

    #[error("Failed to store chunks: {0}")]
    StoreFailed(String),

    #[error("Failed to search chunks: {0}")]
    SearchFailed(String),

    #[error("Failed to delete chunks: {0}")]
    DeleteFailed(String),
}

/// Errors related to indexing a working copy
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Failed to walk directory: {0}")]
    WalkFailed(String),

    #[error("All {failed_files} file(s) failed, no chunks produced: {}", .causes.join("; "))]
    TotalFailure {
        failed_files: usize,
        causes: Vec<String>,
    },

    #[error("Indexing was cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Errors related to git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open git repository at '{path}': {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Failed to clone '{url}': {reason}")]
    CloneFailed { url: String, reason: String },

    #[error("Failed to pull '{path}': {reason}")]
    PullFailed { path: String, reason: String },

    #[error("Failed to compute diff between '{old}' and '{new}': {reason}")]
    DiffComputation {
        old: String,
        new: String,
        reason: String,
    },

    #[error("Failed to acquire repository lock: {0}")]
    LockFailed(String),
}

/// Errors raised for a single malformed segment of a unified diff
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiffError {
    #[error("Missing destination path in header line: {0}")]
    MissingPath(String),

    #[error("Malformed hunk header: {0}")]
    MalformedHunkHeader(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to record validation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty {0}")]
    Empty(String),

    #[error("{field} must be {constraint}, got {actual}")]
    ConstraintViolation {
        field: String,
        constraint: String,
        actual: String,
    },
}

// Conversion from anyhow::Error to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(format!("{:#}", err))
    }
}

impl RagError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        RagError::Other(msg.into())
    }

    /// Check if this error is a transient I/O failure that is safe to retry wholesale
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::VectorDb(
                VectorDbError::ConnectionFailed(_)
                    | VectorDbError::StoreFailed(_)
                    | VectorDbError::DeleteFailed(_)
                    | VectorDbError::SearchFailed(_)
                    | VectorDbError::TableCreationFailed { .. }
            ) | RagError::Git(
                GitError::CloneFailed { .. }
                    | GitError::PullFailed { .. }
                    | GitError::OpenFailed { .. }
            ) | RagError::Io(_)
        )
    }

    /// Check if this error means every file in the batch failed
    pub fn is_total_failure(&self) -> bool {
        matches!(self, RagError::Indexing(IndexingError::TotalFailure { .. }))
    }
}
