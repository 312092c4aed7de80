use super::{VcsHandle, has_tracked_extension};
use crate::error::GitError;
use crate::types::ChangeSet;

/// Classifies the files changed between two commits
///
/// Only paths with a tracked extension participate. Renames become a delete of
/// the old path plus an add of the new one, copies become an add, and type
/// changes are treated as modifications.
#[derive(Debug, Clone)]
pub struct ChangeSetDetector {
    tracked_extensions: Vec<String>,
}

impl ChangeSetDetector {
    pub fn new(tracked_extensions: Vec<String>) -> Self {
        Self { tracked_extensions }
    }

    /// Compute the change set between `old_commit` and `new_commit`
    ///
    /// Returns `GitError::DiffComputation` when the diff itself cannot be produced;
    /// no partial change set is ever returned.
    pub fn detect(
        &self,
        vcs: &dyn VcsHandle,
        old_commit: &str,
        new_commit: &str,
    ) -> Result<ChangeSet, GitError> {
        let name_status = vcs
            .diff_name_status(old_commit, new_commit)
            .map_err(|e| GitError::DiffComputation {
                old: old_commit.to_string(),
                new: new_commit.to_string(),
                reason: format!("{:#}", e),
            })?;

        let change_set = self.classify(&name_status);
        tracing::info!(
            "Changes {}..{}: {} added, {} modified, {} deleted",
            old_commit,
            new_commit,
            change_set.added.len(),
            change_set.modified.len(),
            change_set.deleted.len()
        );
        Ok(change_set)
    }

    /// Classify `STATUS\tpath[\tpath]` lines into a change set
    pub fn classify(&self, name_status: &str) -> ChangeSet {
        let mut change_set = ChangeSet::default();

        for line in name_status.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            let (status, paths) = match fields.split_first() {
                Some((status, paths)) if !paths.is_empty() => (*status, paths),
                _ => {
                    tracing::debug!("Ignoring name-status line without a path: {:?}", line);
                    continue;
                }
            };

            match (status.chars().next(), paths) {
                (Some('A'), [path, ..]) => self.push(&mut change_set.added, path),
                (Some('M' | 'T'), [path, ..]) => self.push(&mut change_set.modified, path),
                (Some('D'), [path, ..]) => self.push(&mut change_set.deleted, path),
                (Some('R'), [old, new, ..]) => {
                    self.push(&mut change_set.deleted, old);
                    self.push(&mut change_set.added, new);
                }
                (Some('C'), [_, new, ..]) => self.push(&mut change_set.added, new),
                _ => tracing::debug!("Ignoring name-status line: {:?}", line),
            }
        }

        change_set
    }

    fn push(&self, list: &mut Vec<String>, path: &str) {
        if has_tracked_extension(path, &self.tracked_extensions) && !list.iter().any(|p| p == path)
        {
            list.push(path.to_string());
        }
    }
}
