//! Content fingerprints of commits.
//!
//! Boundary matching compares tree fingerprints, not commit SHAs, so a commit
//! without a tree is an error rather than something to skip.

use std::collections::HashSet;

use crate::error::{ReleaseNotesError, Result};
use crate::model::{Commit, TreeFingerprint};

/// The tree fingerprint carried on a fetched commit.
pub fn fingerprint(commit: &Commit) -> Result<&TreeFingerprint> {
    commit
        .tree_fingerprint
        .as_ref()
        .ok_or_else(|| ReleaseNotesError::MalformedData {
            sha: commit.sha.clone(),
            detail: "commit has no tree fingerprint".to_string(),
        })
}

/// Fingerprints of every commit, duplicates collapsed.
pub fn fingerprint_set<'a, I>(commits: I) -> Result<HashSet<TreeFingerprint>>
where
    I: IntoIterator<Item = &'a Commit>,
{
    commits
        .into_iter()
        .map(|commit| fingerprint(commit).cloned())
        .collect()
}
