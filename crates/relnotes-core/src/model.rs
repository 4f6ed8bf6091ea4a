//! Immutable value types for records fetched from the source host.
//!
//! Host responses are loosely typed; everything optional on the wire is an
//! explicit `Option` here so callers never have to interpret sentinels.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on items requested per page, for every paginated collection.
pub const PAGE_SIZE: u32 = 100;

/// 1-based page number used to request the next slice of a collection.
pub type PageCursor = u32;

/// The repository a run is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository metadata needed by the traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub default_branch: String,
}

/// The most recent published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

/// A pull request as listed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub number: u64,
    pub title: String,
    pub author: Option<String>,
    /// `None` when the pull request was closed without merging.
    pub merged_at: Option<DateTime<Utc>>,
    pub base_branch: String,
}

impl ChangeRequest {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

/// Identifier of a commit's resulting file tree.
///
/// Two distinct commits share a fingerprint when their trees are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeFingerprint(pub String);

impl TreeFingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A commit belonging to a pull request or a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub tree_fingerprint: Option<TreeFingerprint>,
}

impl Commit {
    pub fn new(
        sha: impl Into<String>,
        message: impl Into<String>,
        tree_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            sha: sha.into(),
            message: message.into(),
            tree_fingerprint: Some(TreeFingerprint::new(tree_fingerprint)),
        }
    }
}

/// One slice of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor of the following page, `None` on the last one.
    pub next: Option<PageCursor>,
}
