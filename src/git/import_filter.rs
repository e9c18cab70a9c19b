//! Commits excluded from ownership counts
//!
//! Bulk history imports would otherwise credit one person with most of the
//! codebase. Lines blamed on these commits weigh zero, but the commits are
//! still parsed and cached like any other.

use std::collections::BTreeSet;

/// Immutable set of full commit hashes, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ImportFilter {
    commits: BTreeSet<String>,
}

impl ImportFilter {
    pub fn new<I, S>(commits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            commits: commits
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// Filter that excludes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, commit_id: &str) -> bool {
        if commit_id.bytes().any(|b| b.is_ascii_uppercase()) {
            self.commits.contains(&commit_id.to_ascii_lowercase())
        } else {
            self.commits.contains(commit_id)
        }
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}
