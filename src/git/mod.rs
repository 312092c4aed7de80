//! Version-control collaborator and change-set detection
//!
//! [`GitRepository`] wraps a `git2` working copy (clone, fast-forward to the
//! remote, name-status diffs between commits). [`ChangeSetDetector`] turns a
//! name-status diff into the added/modified/deleted lists that drive incremental
//! index synchronisation.

/// Change-set classification over name-status output
pub mod change_set;
/// git2-backed working copy
pub mod repository;

pub use change_set::ChangeSetDetector;
pub use repository::GitRepository;

use anyhow::Result;
use std::path::Path;

/// Operations the indexing pipeline needs from a version-control working copy
pub trait VcsHandle {
    /// Root of the checked-out working tree
    fn workdir(&self) -> &Path;

    /// `git diff --name-status old new` style output: one `STATUS\tpath[\tpath]` per line
    fn diff_name_status(&self, old_commit: &str, new_commit: &str) -> Result<String>;
}

/// Whether `path` ends in one of `extensions` (given without the leading dot)
pub fn has_tracked_extension(path: &str, extensions: &[String]) -> bool {
    let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|tracked| tracked.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
