//! Per pull request decisions: stop, skip, or emit.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boundary::LazyBoundary;
use crate::cancel::CancelSignal;
use crate::error::Result;
use crate::fingerprint::fingerprint_set;
use crate::host::SourceHost;
use crate::model::{ChangeRequest, RepoRef};
use crate::pager::{CommitPages, PageWalker};
use crate::render::{render_change_request, RenderOptions};

/// Traversal termination rules. Both may be active; either one ends the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopPolicy {
    /// Stop when this pull request number is reached, before emitting it.
    pub at_number: Option<u64>,
    /// Stop at the first pull request with no commits newer than the latest release.
    pub at_release_boundary: bool,
}

/// Why a run ended before the host ran out of pull requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ReachedNumber(u64),
    PastReleaseBoundary { number: u64, release_tag: String },
}

/// Why a pull request was left out without ending the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unmerged,
    SideBranch { base_branch: String },
}

/// Result of processing one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Emitted,
    Skipped(SkipReason),
    Stop(StopReason),
}

/// Applies the stop and skip rules to a pull request and renders it.
pub struct ChangeRequestProcessor<'a> {
    host: &'a dyn SourceHost,
    repo: &'a RepoRef,
    policy: StopPolicy,
    options: RenderOptions,
    cancel: CancelSignal,
}

impl<'a> ChangeRequestProcessor<'a> {
    pub fn new(
        host: &'a dyn SourceHost,
        repo: &'a RepoRef,
        policy: StopPolicy,
        options: RenderOptions,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            host,
            repo,
            policy,
            options,
            cancel,
        }
    }

    /// Decide on `change_request` and write its entry to `out` when emitted.
    ///
    /// The boundary is only resolved when boundary stopping is enabled and a
    /// merged pull request on the default branch reaches that check.
    pub async fn process<W: Write + ?Sized>(
        &self,
        change_request: &ChangeRequest,
        boundary: &LazyBoundary<'_>,
        out: &mut W,
    ) -> Result<Outcome> {
        let number = change_request.number;

        if self.policy.at_number == Some(number) {
            return Ok(Outcome::Stop(StopReason::ReachedNumber(number)));
        }
        if !change_request.is_merged() {
            debug!(number, "skipping unmerged pull request");
            return Ok(Outcome::Skipped(SkipReason::Unmerged));
        }

        let commits = PageWalker::new(
            CommitPages::new(self.host, self.repo, number),
            self.cancel.clone(),
        )
        .collect_all()
        .await?;

        if self.policy.at_release_boundary {
            if change_request.base_branch != boundary.default_branch().await? {
                debug!(
                    number,
                    base = %change_request.base_branch,
                    "skipping pull request not based on the default branch"
                );
                return Ok(Outcome::Skipped(SkipReason::SideBranch {
                    base_branch: change_request.base_branch.clone(),
                }));
            }
            let boundary = boundary.get().await?;
            if !boundary.overlaps(&fingerprint_set(&commits)?) {
                return Ok(Outcome::Stop(StopReason::PastReleaseBoundary {
                    number,
                    release_tag: boundary.release_tag.clone(),
                }));
            }
        }

        let entry = render_change_request(change_request, &commits, self.options);
        out.write_all(entry.as_bytes())?;
        debug!(number, commits = commits.len(), "emitted pull request");
        Ok(Outcome::Emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Boundary;
    use crate::fakes::MemoryHost;
    use crate::model::{Commit, TreeFingerprint};
    use chrono::Utc;

    fn merged(number: u64, base: &str) -> ChangeRequest {
        ChangeRequest {
            number,
            title: format!("Change {number}"),
            author: Some("dev".to_string()),
            merged_at: Some(Utc::now()),
            base_branch: base.to_string(),
        }
    }

    fn boundary(fingerprints: &[&str]) -> LazyBoundary<'static> {
        LazyBoundary::precomputed(Boundary::new(
            "main",
            "v1.0.0",
            fingerprints.iter().map(|f| TreeFingerprint::new(*f)),
        ))
    }

    fn processor<'a>(
        host: &'a MemoryHost,
        repo: &'a RepoRef,
        policy: StopPolicy,
    ) -> ChangeRequestProcessor<'a> {
        ChangeRequestProcessor::new(
            host,
            repo,
            policy,
            RenderOptions::default(),
            CancelSignal::new(),
        )
    }

    #[tokio::test]
    async fn test_stop_number_wins_over_merge_status() {
        let host = MemoryHost::new("main");
        let repo = RepoRef::new("acme", "widgets");
        let policy = StopPolicy {
            at_number: Some(7),
            ..Default::default()
        };
        let mut unmerged = merged(7, "main");
        unmerged.merged_at = None;

        let mut out = Vec::new();
        let outcome = processor(&host, &repo, policy)
            .process(&unmerged, &boundary(&[]), &mut out)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Stop(StopReason::ReachedNumber(7)));
        assert!(out.is_empty());
        assert_eq!(host.commit_page_calls(), 0);
    }

    #[tokio::test]
    async fn test_unmerged_is_skipped_without_fetching_commits() {
        let host = MemoryHost::new("main");
        let repo = RepoRef::new("acme", "widgets");
        let mut pr = merged(3, "main");
        pr.merged_at = None;

        let mut out = Vec::new();
        let outcome = processor(&host, &repo, StopPolicy::default())
            .process(&pr, &boundary(&[]), &mut out)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Skipped(SkipReason::Unmerged));
        assert_eq!(host.commit_page_calls(), 0);
    }

    #[tokio::test]
    async fn test_side_branch_skipped_under_boundary_policy() {
        let host = MemoryHost::new("main")
            .with_change_request(merged(4, "release-1.x"), vec![Commit::new("a", "x", "f1")]);
        let repo = RepoRef::new("acme", "widgets");
        let policy = StopPolicy {
            at_release_boundary: true,
            ..Default::default()
        };

        let mut out = Vec::new();
        let outcome = processor(&host, &repo, policy)
            .process(&merged(4, "release-1.x"), &boundary(&["f1"]), &mut out)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Skipped(SkipReason::SideBranch {
                base_branch: "release-1.x".to_string()
            })
        );
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_side_branch_skip_needs_no_release() {
        let host = MemoryHost::new("main")
            .with_change_request(merged(4, "release-1.x"), vec![Commit::new("a", "x", "f1")]);
        let repo = RepoRef::new("acme", "widgets");
        let lazy = LazyBoundary::new(crate::boundary::BoundaryResolver::new(
            &host,
            &repo,
            CancelSignal::new(),
        ));
        let policy = StopPolicy {
            at_release_boundary: true,
            ..Default::default()
        };

        let mut out = Vec::new();
        let outcome = processor(&host, &repo, policy)
            .process(&merged(4, "release-1.x"), &lazy, &mut out)
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Skipped(SkipReason::SideBranch { .. })));
        assert!(!lazy.is_resolved());
        assert_eq!(host.release_calls(), 0);
        assert_eq!(host.compare_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_overlap_with_boundary_stops() {
        let host = MemoryHost::new("main")
            .with_change_request(merged(5, "main"), vec![Commit::new("a", "x", "f3")]);
        let repo = RepoRef::new("acme", "widgets");
        let policy = StopPolicy {
            at_release_boundary: true,
            ..Default::default()
        };

        let mut out = Vec::new();
        let outcome = processor(&host, &repo, policy)
            .process(&merged(5, "main"), &boundary(&["f1", "f2"]), &mut out)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Stop(StopReason::PastReleaseBoundary {
                number: 5,
                release_tag: "v1.0.0".to_string()
            })
        );
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_overlap_with_boundary_emits() {
        let host = MemoryHost::new("main").with_change_request(
            merged(6, "main"),
            vec![Commit::new("a", "x", "f9"), Commit::new("b", "y", "f2")],
        );
        let repo = RepoRef::new("acme", "widgets");
        let policy = StopPolicy {
            at_release_boundary: true,
            ..Default::default()
        };

        let mut out = Vec::new();
        let outcome = processor(&host, &repo, policy)
            .process(&merged(6, "main"), &boundary(&["f1", "f2"]), &mut out)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Emitted);
        assert_eq!(String::from_utf8(out).unwrap(), "- PR #6 Change 6\n");
    }

    #[tokio::test]
    async fn test_boundary_not_resolved_when_policy_disabled() {
        let host = MemoryHost::new("main")
            .with_release("v1.0.0")
            .with_change_request(merged(6, "main"), vec![Commit::new("a", "x", "f9")]);
        let repo = RepoRef::new("acme", "widgets");
        let lazy = LazyBoundary::new(crate::boundary::BoundaryResolver::new(
            &host,
            &repo,
            CancelSignal::new(),
        ));

        let mut out = Vec::new();
        processor(&host, &repo, StopPolicy::default())
            .process(&merged(6, "main"), &lazy, &mut out)
            .await
            .unwrap();

        assert!(!lazy.is_resolved());
        assert_eq!(host.compare_calls(), 0);
    }
}
