/// Centralized platform-specific path computation
///
/// Provides consistent default locations for the vector database, cloned
/// working copies, lock files and the config file across Windows, macOS and Linux.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "review-index";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate data directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_DATA_HOME or ~/.local/share
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {data_dir}/review-index
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR_NAME)
    }

    /// Returns: {config_dir}/review-index
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR_NAME)
    }

    /// Returns: {data_dir}/review-index/lancedb
    pub fn default_lancedb_path() -> PathBuf {
        Self::project_data_dir().join("lancedb")
    }

    /// Returns: {data_dir}/review-index/repos
    pub fn default_repo_clone_dir() -> PathBuf {
        Self::project_data_dir().join("repos")
    }

    /// Returns: {data_dir}/review-index/locks
    pub fn default_lock_dir() -> PathBuf {
        Self::project_data_dir().join("locks")
    }

    /// Returns: {config_dir}/review-index/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}
