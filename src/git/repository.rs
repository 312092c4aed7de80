use super::VcsHandle;
use crate::error::GitError;
use anyhow::{Context, Result};
use git2::{Delta, Repository, ResetType};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Local working copy of a remote repository
pub struct GitRepository {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepository {
    /// Open an existing working copy
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| GitError::OpenFailed {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf());

        Ok(Self { repo, workdir })
    }

    /// Clone `url` into `path`, or bring an existing clone up to date with its remote
    ///
    /// Blocking; callers on an async runtime should use `spawn_blocking`.
    pub fn clone_or_pull(url: &str, path: &Path) -> Result<Self, GitError> {
        if path.join(".git").exists() {
            tracing::info!("Pulling latest changes into {}", path.display());
            let repo = Self::open(path)?;
            repo.pull().map_err(|e| GitError::PullFailed {
                path: path.display().to_string(),
                reason: format!("{:#}", e),
            })?;
            return Ok(repo);
        }

        tracing::info!("Cloning {} into {}", url, path.display());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GitError::CloneFailed {
                url: url.to_string(),
                reason: format!("cannot create {}: {}", parent.display(), e),
            })?;
        }

        let repo = Repository::clone(url, path).map_err(|e| GitError::CloneFailed {
            url: url.to_string(),
            reason: e.message().to_string(),
        })?;

        Ok(Self {
            repo,
            workdir: path.to_path_buf(),
        })
    }

    /// Fetch `origin` and move the checked-out branch to the fetched tip
    ///
    /// The working copy is a read-only mirror, so a diverged branch (force push)
    /// is reset to the remote rather than merged.
    fn pull(&self) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote("origin")
            .context("No 'origin' remote")?;
        remote
            .fetch(&[] as &[&str], None, None)
            .context("Fetch from origin failed")?;

        let head = self.repo.head().context("Working copy has no HEAD")?;
        let target = match head.shorthand().filter(|_| head.is_branch()) {
            Some(branch) => self
                .repo
                .refname_to_id(&format!("refs/remotes/origin/{}", branch))
                .with_context(|| format!("No remote branch origin/{}", branch))?,
            None => self
                .repo
                .refname_to_id("FETCH_HEAD")
                .context("Nothing fetched for detached HEAD")?,
        };

        if head.target() == Some(target) {
            tracing::debug!("Working copy already at {}", target);
            return Ok(());
        }

        let object = self.repo.find_object(target, None)?;
        self.repo
            .reset(&object, ResetType::Hard, None)
            .context("Failed to move working copy to fetched commit")?;

        tracing::info!("Working copy updated to {}", target);
        Ok(())
    }
}

impl VcsHandle for GitRepository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn diff_name_status(&self, old_commit: &str, new_commit: &str) -> Result<String> {
        let old_tree = self
            .repo
            .revparse_single(old_commit)
            .and_then(|o| o.peel_to_tree())
            .with_context(|| format!("Cannot resolve '{}'", old_commit))?;
        let new_tree = self
            .repo
            .revparse_single(new_commit)
            .and_then(|o| o.peel_to_tree())
            .with_context(|| format!("Cannot resolve '{}'", new_commit))?;

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;

        let mut output = String::new();
        for delta in diff.deltas() {
            let old_path = delta.old_file().path().map(|p| p.to_string_lossy());
            let new_path = delta.new_file().path().map(|p| p.to_string_lossy());

            match (delta.status(), old_path, new_path) {
                (Delta::Added, _, Some(path)) => writeln!(output, "A\t{}", path)?,
                (Delta::Modified, _, Some(path)) => writeln!(output, "M\t{}", path)?,
                (Delta::Typechange, _, Some(path)) => writeln!(output, "T\t{}", path)?,
                (Delta::Deleted, Some(path), _) => writeln!(output, "D\t{}", path)?,
                (Delta::Renamed, Some(old), Some(new)) => {
                    writeln!(output, "R100\t{}\t{}", old, new)?
                }
                (Delta::Copied, Some(old), Some(new)) => writeln!(output, "C100\t{}\t{}", old, new)?,
                (status, _, _) => tracing::debug!("Ignoring delta with status {:?}", status),
            }
        }

        Ok(output)
    }
}
