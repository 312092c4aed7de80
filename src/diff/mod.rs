//! Unified diff parsing and review-comment positioning
//!
//! A pull request diff is split into one [`FileDiff`] per `diff --git` block. Each
//! block carries a map from new-file line numbers to the 1-based position of that
//! line inside the block, which is what code-hosting review APIs expect when an
//! inline comment is anchored to an added line.
//!
//! Parsing never fails as a whole: a segment with an unreadable header or hunk
//! range is logged and dropped, and the remaining files are still returned.

use crate::error::DiffError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FILE_DELIMITER: &str = "diff --git ";

/// One file's slice of a unified diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Post-change path (the `b/` side of the header)
    pub path: String,
    /// Raw block for this file, starting with `diff --git `
    pub content: String,
    /// New-file line number -> 1-based position within `content`, added lines only
    pub line_mapping: BTreeMap<usize, usize>,
}

impl FileDiff {
    /// Diff position of an added line, if the line was added in this diff
    pub fn position_for(&self, line_number: usize) -> Option<usize> {
        self.line_mapping.get(&line_number).copied()
    }
}

/// Comment produced by the review step, addressed by new-file line number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineComment {
    pub line_number: usize,
    pub body: String,
}

/// Comment anchored to a diff position, ready for a review payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedComment {
    pub path: String,
    pub position: usize,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedComments {
    pub positioned: Vec<PositionedComment>,
    /// Comments whose line is not an added line of the diff, or whose body is empty
    pub unmapped: Vec<LineComment>,
}

/// Parse a unified diff into per-file structures, in source order
///
/// Text before the first `diff --git ` header is ignored. Empty input yields an
/// empty vector.
pub fn parse_diff(diff_text: &str) -> Vec<FileDiff> {
    let mut file_diffs = Vec::new();

    for segment in diff_text.split(FILE_DELIMITER).skip(1) {
        match parse_segment(segment) {
            Ok(file_diff) => file_diffs.push(file_diff),
            Err(e) => {
                let preview: String = segment.chars().take(100).collect();
                tracing::warn!("Skipping malformed file diff segment: {} ({:?})", e, preview);
            }
        }
    }

    file_diffs
}

fn parse_segment(segment: &str) -> Result<FileDiff, DiffError> {
    let header = segment.split('\n').next().unwrap_or_default();
    let path = destination_path(header)?;

    let mut line_mapping = BTreeMap::new();
    let mut position_in_diff = 0usize;
    let mut current_new_line_num = 0usize;

    for line in segment.split('\n') {
        position_in_diff += 1;

        if line.starts_with("@@") {
            current_new_line_num = hunk_new_start(line)?;
        } else if line.starts_with('+') && !line.starts_with("+++") {
            line_mapping.insert(current_new_line_num, position_in_diff);
            current_new_line_num += 1;
        } else if line.starts_with(' ') && !line.starts_with("---") {
            current_new_line_num += 1;
        }
    }

    Ok(FileDiff {
        path,
        content: format!("{}{}", FILE_DELIMITER, segment),
        line_mapping,
    })
}

/// Extract the path after the ` b/` marker of a `diff --git a/.. b/..` header
fn destination_path(header: &str) -> Result<String, DiffError> {
    let header = header.trim_end();
    let start = header
        .rfind(" b/")
        .ok_or_else(|| DiffError::MissingPath(header.to_string()))?;
    let path = &header[start + 3..];

    if path.is_empty() {
        return Err(DiffError::MissingPath(header.to_string()));
    }
    Ok(path.to_string())
}

/// Starting new-file line of a hunk header such as `@@ -1,2 +1,3 @@ def f():`
fn hunk_new_start(line: &str) -> Result<usize, DiffError> {
    let malformed = || DiffError::MalformedHunkHeader(line.trim_end().to_string());

    let range = line
        .split_whitespace()
        .nth(2)
        .and_then(|token| token.strip_prefix('+'))
        .ok_or_else(malformed)?;
    let start = range.split(',').next().unwrap_or_default();

    start.parse().map_err(|_| malformed())
}

/// Anchor line-number comments to positions in a file's diff
pub fn position_comments(file_diff: &FileDiff, comments: Vec<LineComment>) -> PositionedComments {
    let mut result = PositionedComments::default();

    for comment in comments {
        let position = if comment.body.trim().is_empty() {
            None
        } else {
            file_diff.position_for(comment.line_number)
        };

        match position {
            Some(position) => result.positioned.push(PositionedComment {
                path: file_diff.path.clone(),
                position,
                body: comment.body,
            }),
            None => {
                tracing::warn!(
                    "Could not map line {} to a diff position in {}",
                    comment.line_number,
                    file_diff.path
                );
                result.unmapped.push(comment);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests;
