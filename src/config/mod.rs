/// Configuration system for review-index
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, RagError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Vector database configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Database backend: "lancedb" or "memory"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Directory holding one working copy per repository ({owner}/{repo})
    #[serde(default = "default_repo_clone_dir")]
    pub repo_clone_dir: PathBuf,

    /// Directory for per-repository lock files
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,

    /// File extensions (without the dot) that participate in indexing
    #[serde(default = "default_tracked_extensions")]
    pub tracked_extensions: Vec<String>,

    /// Upper bound on files processed concurrently (embedder is a shared resource)
    #[serde(default = "default_max_parallel_files")]
    pub max_parallel_files: usize,

    /// Maximum file size to index during a full walk (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Glob patterns excluded from a full walk
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of context chunks returned per file diff
    #[serde(default = "default_retrieval_limit")]
    pub limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset: trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit structured JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_db_backend() -> String {
    "lancedb".to_string()
}

fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_repo_clone_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_repo_clone_dir()
}

fn default_lock_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_lock_dir()
}

fn default_tracked_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_max_parallel_files() -> usize {
    4
}

fn default_max_file_size() -> usize {
    1_048_576 // 1 MB
}

fn default_retrieval_limit() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

const VALID_BACKENDS: &[&str] = &["lancedb", "memory"];
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            lancedb_path: default_lancedb_path(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            repo_clone_dir: default_repo_clone_dir(),
            lock_dir: default_lock_dir(),
            tracked_extensions: default_tracked_extensions(),
            max_parallel_files: default_max_parallel_files(),
            max_file_size: default_max_file_size(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_retrieval_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if !VALID_BACKENDS.contains(&self.vector_db.backend.as_str()) {
            return Err(invalid(
                "vector_db.backend",
                format!(
                    "must be 'lancedb' or 'memory', got '{}'",
                    self.vector_db.backend
                ),
            ));
        }

        if self.indexing.tracked_extensions.is_empty() {
            return Err(invalid(
                "indexing.tracked_extensions",
                "must list at least one extension".to_string(),
            ));
        }

        if self.indexing.max_parallel_files == 0 {
            return Err(invalid(
                "indexing.max_parallel_files",
                "must be greater than 0".to_string(),
            ));
        }

        if self.indexing.max_file_size == 0 {
            return Err(invalid(
                "indexing.max_file_size",
                "must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.limit == 0 {
            return Err(invalid(
                "retrieval.limit",
                "must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(
                "logging.level",
                format!(
                    "must be one of {}, got '{}'",
                    VALID_LOG_LEVELS.join(", "),
                    self.logging.level
                ),
            ));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("REVIEW_INDEX_DB_BACKEND") {
            self.vector_db.backend = backend;
        }

        if let Ok(path) = std::env::var("REVIEW_INDEX_LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Ok(model) = std::env::var("REVIEW_INDEX_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(dir) = std::env::var("REVIEW_INDEX_REPO_CLONE_DIR") {
            self.indexing.repo_clone_dir = PathBuf::from(dir);
        }

        if let Ok(max_parallel) = std::env::var("REVIEW_INDEX_MAX_PARALLEL")
            && let Ok(n) = max_parallel.parse()
        {
            self.indexing.max_parallel_files = n;
        }

        if let Ok(limit) = std::env::var("REVIEW_INDEX_RETRIEVAL_LIMIT")
            && let Ok(n) = limit.parse()
        {
            self.retrieval.limit = n;
        }

        if let Ok(level) = std::env::var("REVIEW_INDEX_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::new`] but reads the given file instead of the default location
    pub fn from_file_with_env(path: &Path) -> Result<Self, RagError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Whether a path (relative to the repository root) has a tracked extension
    pub fn is_tracked(&self, path: &str) -> bool {
        crate::git::has_tracked_extension(path, &self.indexing.tracked_extensions)
    }
}

fn invalid(key: &str, reason: String) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason,
    }
    .into()
}
