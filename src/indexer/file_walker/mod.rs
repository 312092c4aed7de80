//! File walking functionality for directory traversal

use crate::git::has_tracked_extension;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Collects tracked source files under a working copy
pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) max_file_size: usize,
    pub(crate) tracked_extensions: Vec<String>,
    exclude: GlobSet,
    cancel: Option<CancellationToken>,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>, max_file_size: usize, tracked_extensions: Vec<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size,
            tracked_extensions,
            exclude: GlobSet::empty(),
            cancel: None,
        }
    }

    /// Skip files whose repository-relative path matches any of `patterns`
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(
                Glob::new(pattern)
                    .with_context(|| format!("Invalid exclude pattern '{}'", pattern))?,
            );
        }
        self.exclude = builder.build().context("Failed to build exclude patterns")?;
        Ok(self)
    }

    /// Stop the walk early once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// Walk the directory and return repository-relative paths, sorted
    pub fn walk(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            anyhow::bail!("Root directory does not exist: {:?}", self.root);
        }
        if !self.root.is_dir() {
            anyhow::bail!("Root path is not a directory: {:?}", self.root);
        }

        let mut files = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(true) // Respect .gitignore, .ignore, etc.
            .hidden(false) // Don't skip hidden files by default
            .require_git(false)
            .build();

        for entry in walker {
            if self.is_cancelled() {
                tracing::info!("File walk cancelled after {} files", files.len());
                anyhow::bail!("Indexing was cancelled");
            }

            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_dir() {
                continue;
            }

            // Explicitly skip .git directory contents
            if path.components().any(|c| c.as_os_str() == ".git") {
                continue;
            }

            let relative_path = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            if !has_tracked_extension(&relative_path, &self.tracked_extensions) {
                continue;
            }

            if self.exclude.is_match(&relative_path) {
                tracing::debug!("Skipping excluded file: {}", relative_path);
                continue;
            }

            if let Ok(metadata) = fs::metadata(path)
                && metadata.len() > self.max_file_size as u64
            {
                tracing::debug!("Skipping large file: {:?}", path);
                continue;
            }

            files.push(relative_path);
        }

        files.sort();
        tracing::info!("Found {} files to index", files.len());
        Ok(files)
    }
}
