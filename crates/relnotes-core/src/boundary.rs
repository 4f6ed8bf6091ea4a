//! The latest-release boundary.
//!
//! [`BoundaryResolver`] asks the host which commits sit on the default branch
//! but not on the latest release tag and keeps their tree fingerprints.
//! [`LazyBoundary`] makes sure each lookup happens at most once per run, and
//! only if something actually asks for it. The default branch is cached on its
//! own so side-branch pull requests can be skipped without touching releases.

use std::collections::HashSet;

use tokio::sync::OnceCell;
use tracing::info;

use crate::cancel::CancelSignal;
use crate::error::{ReleaseNotesError, Result};
use crate::fingerprint::fingerprint_set;
use crate::host::SourceHost;
use crate::model::{RepoRef, TreeFingerprint};

/// Commits new since the latest release, by tree fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub default_branch: String,
    pub release_tag: String,
    pub fingerprints: HashSet<TreeFingerprint>,
}

impl Boundary {
    pub fn new(
        default_branch: impl Into<String>,
        release_tag: impl Into<String>,
        fingerprints: impl IntoIterator<Item = TreeFingerprint>,
    ) -> Self {
        Self {
            default_branch: default_branch.into(),
            release_tag: release_tag.into(),
            fingerprints: fingerprints.into_iter().collect(),
        }
    }

    /// `true` when at least one of `candidates` is new since the release.
    pub fn overlaps(&self, candidates: &HashSet<TreeFingerprint>) -> bool {
        !self.fingerprints.is_disjoint(candidates)
    }
}

/// Computes a [`Boundary`] from the host.
pub struct BoundaryResolver<'a> {
    host: &'a dyn SourceHost,
    repo: &'a RepoRef,
    cancel: CancelSignal,
}

impl<'a> BoundaryResolver<'a> {
    pub fn new(host: &'a dyn SourceHost, repo: &'a RepoRef, cancel: CancelSignal) -> Self {
        Self { host, repo, cancel }
    }

    /// The repository's default branch.
    pub async fn default_branch(&self) -> Result<String> {
        self.cancel.check()?;
        let repository = self
            .host
            .get_repository(self.repo)
            .await
            .map_err(|e| ReleaseNotesError::fetch(format!("get repository {}", self.repo), e))?;
        Ok(repository.default_branch)
    }

    /// Fingerprints of the commits between the latest release tag and
    /// `default_branch`.
    pub async fn since_latest_release(&self, default_branch: &str) -> Result<Boundary> {
        self.cancel.check()?;
        let release = self
            .host
            .get_latest_release(self.repo)
            .await
            .map_err(|e| {
                ReleaseNotesError::fetch(format!("get latest release of {}", self.repo), e)
            })?
            .ok_or_else(|| ReleaseNotesError::NoReleaseFound {
                repo: self.repo.to_string(),
            })?;

        self.cancel.check()?;
        let commits = self
            .host
            .compare_commits(self.repo, &release.tag_name, default_branch)
            .await
            .map_err(|e| {
                ReleaseNotesError::fetch(
                    format!(
                        "compare {}...{} in {}",
                        release.tag_name, default_branch, self.repo
                    ),
                    e,
                )
            })?;

        let fingerprints = fingerprint_set(&commits)?;
        info!(
            repo = %self.repo,
            release = %release.tag_name,
            branch = default_branch,
            commits = commits.len(),
            fingerprints = fingerprints.len(),
            "resolved release boundary"
        );

        Ok(Boundary {
            default_branch: default_branch.to_string(),
            release_tag: release.tag_name,
            fingerprints,
        })
    }

    /// Resolve the default branch, the latest release tag and the comparison
    /// between them.
    pub async fn resolve(&self) -> Result<Boundary> {
        let default_branch = self.default_branch().await?;
        self.since_latest_release(&default_branch).await
    }
}

/// A [`Boundary`] computed on first use and reused afterwards.
pub struct LazyBoundary<'a> {
    resolver: Option<BoundaryResolver<'a>>,
    default_branch: OnceCell<String>,
    cell: OnceCell<Boundary>,
}

impl<'a> LazyBoundary<'a> {
    pub fn new(resolver: BoundaryResolver<'a>) -> Self {
        Self {
            resolver: Some(resolver),
            default_branch: OnceCell::new(),
            cell: OnceCell::new(),
        }
    }

    /// An already-known boundary; the host is never consulted.
    pub fn precomputed(boundary: Boundary) -> Self {
        Self {
            resolver: None,
            default_branch: OnceCell::new_with(Some(boundary.default_branch.clone())),
            cell: OnceCell::new_with(Some(boundary)),
        }
    }

    fn resolver(&self) -> Result<&BoundaryResolver<'a>> {
        self.resolver.as_ref().ok_or_else(|| {
            ReleaseNotesError::Config("release boundary requested without a resolver".to_string())
        })
    }

    /// The default branch alone. Never looks at releases.
    pub async fn default_branch(&self) -> Result<&str> {
        let branch = self
            .default_branch
            .get_or_try_init(|| async { self.resolver()?.default_branch().await })
            .await?;
        Ok(branch.as_str())
    }

    pub async fn get(&self) -> Result<&Boundary> {
        self.cell
            .get_or_try_init(|| async {
                let default_branch = self.default_branch().await?;
                self.resolver()?.since_latest_release(default_branch).await
            })
            .await
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryHost;
    use crate::model::Commit;

    fn repo() -> RepoRef {
        RepoRef::new("acme", "widgets")
    }

    #[tokio::test]
    async fn test_resolve_collects_compare_fingerprints() {
        let host = MemoryHost::new("main")
            .with_release("v1.0.0")
            .with_comparison(vec![
                Commit::new("c1", "one", "t1"),
                Commit::new("c2", "two", "t2"),
                Commit::new("c3", "same tree as c1", "t1"),
            ]);
        let repo = repo();
        let boundary = BoundaryResolver::new(&host, &repo, CancelSignal::new())
            .resolve()
            .await
            .unwrap();

        assert_eq!(boundary.default_branch, "main");
        assert_eq!(boundary.release_tag, "v1.0.0");
        assert_eq!(boundary.fingerprints.len(), 2);
        assert_eq!(
            host.compared_refs(),
            vec![("v1.0.0".to_string(), "main".to_string())]
        );
    }

    #[tokio::test]
    async fn test_resolve_without_release_is_reported() {
        let host = MemoryHost::new("main");
        let repo = repo();
        let err = BoundaryResolver::new(&host, &repo, CancelSignal::new())
            .resolve()
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseNotesError::NoReleaseFound { .. }));
        assert_eq!(host.compare_calls(), 0);
    }

    #[tokio::test]
    async fn test_lazy_boundary_resolves_once() {
        let host = MemoryHost::new("main")
            .with_release("v1.0.0")
            .with_comparison(vec![Commit::new("c1", "one", "t1")]);
        let repo = repo();
        let lazy = LazyBoundary::new(BoundaryResolver::new(&host, &repo, CancelSignal::new()));

        assert!(!lazy.is_resolved());
        assert_eq!(host.compare_calls(), 0);

        lazy.get().await.unwrap();
        lazy.get().await.unwrap();
        assert!(lazy.is_resolved());
        assert_eq!(host.compare_calls(), 1);
        assert_eq!(host.release_calls(), 1);
    }

    #[tokio::test]
    async fn test_default_branch_does_not_touch_releases() {
        let host = MemoryHost::new("trunk");
        let repo = repo();
        let lazy = LazyBoundary::new(BoundaryResolver::new(&host, &repo, CancelSignal::new()));

        assert_eq!(lazy.default_branch().await.unwrap(), "trunk");
        assert_eq!(lazy.default_branch().await.unwrap(), "trunk");
        assert!(!lazy.is_resolved());
        assert_eq!(host.repository_calls(), 1);
        assert_eq!(host.release_calls(), 0);
        assert_eq!(host.compare_calls(), 0);
    }

    #[tokio::test]
    async fn test_boundary_reuses_cached_default_branch() {
        let host = MemoryHost::new("main")
            .with_release("v1.0.0")
            .with_comparison(vec![Commit::new("c1", "one", "t1")]);
        let repo = repo();
        let lazy = LazyBoundary::new(BoundaryResolver::new(&host, &repo, CancelSignal::new()));

        lazy.default_branch().await.unwrap();
        let boundary = lazy.get().await.unwrap();
        assert_eq!(boundary.default_branch, "main");
        assert_eq!(host.repository_calls(), 1);
    }

    #[tokio::test]
    async fn test_precomputed_boundary_skips_host() {
        let lazy = LazyBoundary::precomputed(Boundary::new(
            "main",
            "v2",
            [TreeFingerprint::new("t9")],
        ));
        let boundary = lazy.get().await.unwrap();
        assert_eq!(boundary.release_tag, "v2");
        assert_eq!(lazy.default_branch().await.unwrap(), "main");
    }

    #[test]
    fn test_overlaps() {
        let boundary = Boundary::new(
            "main",
            "v1",
            [TreeFingerprint::new("f1"), TreeFingerprint::new("f2")],
        );
        let hit: HashSet<_> = [TreeFingerprint::new("f1")].into_iter().collect();
        let miss: HashSet<_> = [TreeFingerprint::new("f3")].into_iter().collect();
        assert!(boundary.overlaps(&hit));
        assert!(!boundary.overlaps(&miss));
        assert!(!boundary.overlaps(&HashSet::new()));
    }
}
