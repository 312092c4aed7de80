//! Filesystem-based locking for cross-process coordination
//!
//! Two `review-index` processes pointed at the same clone directory must not
//! pull and reindex the same repository at once. The in-process map in
//! [`super::ReviewIndexClient`] serialises tasks; this lock serialises processes.

use crate::error::GitError;
use crate::vector_db::table_name_for_repo;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Lock file path for a repository URL inside `lock_dir`
///
/// Keyed on the table name so URL spellings of one repository share a lock.
fn lock_file_path(lock_dir: &Path, repo_url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(table_name_for_repo(repo_url).as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    lock_dir.join(format!("{}.lock", &hash[..16]))
}

/// Guard that holds an exclusive lock on one repository
///
/// Released when dropped; the OS releases it if the process dies.
pub struct RepoLockGuard {
    _file: File,
    path: PathBuf,
}

impl RepoLockGuard {
    /// Try to take the lock without waiting
    ///
    /// `Ok(None)` means another process holds it.
    pub fn try_acquire(lock_dir: &Path, repo_url: &str) -> Result<Option<Self>, GitError> {
        let path = lock_file_path(lock_dir, repo_url);

        fs::create_dir_all(lock_dir).map_err(|e| {
            GitError::LockFailed(format!("cannot create {}: {}", lock_dir.display(), e))
        })?;
        let file = File::create(&path).map_err(|e| {
            GitError::LockFailed(format!("cannot create {}: {}", path.display(), e))
        })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired repository lock for {} ({:?})", repo_url, path);
                Ok(Some(Self { _file: file, path }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                tracing::debug!("Repository lock for {} is held elsewhere", repo_url);
                Ok(None)
            }
            Err(e) => Err(GitError::LockFailed(format!("{}: {}", path.display(), e))),
        }
    }

    /// Wait for the lock, polling until it is free or `cancel` fires
    pub async fn acquire(
        lock_dir: &Path,
        repo_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Self, GitError> {
        let start = Instant::now();
        let mut announced = false;

        loop {
            if let Some(guard) = Self::try_acquire(lock_dir, repo_url)? {
                if announced {
                    tracing::info!("Acquired repository lock after {:?}", start.elapsed());
                }
                return Ok(guard);
            }

            if !announced {
                tracing::info!("Waiting for another process indexing {}", repo_url);
                announced = true;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(GitError::LockFailed(format!(
                        "cancelled while waiting for lock on {}",
                        repo_url
                    )));
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}

impl Drop for RepoLockGuard {
    fn drop(&mut self) {
        // the lock file is left in place for reuse
        tracing::debug!("Releasing repository lock {:?}", self.path);
    }
}
