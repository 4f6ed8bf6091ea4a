//! The source-hosting API seam.
//!
//! [`SourceHost`] is the only way the traversal talks to the outside world.
//! [`crate::github::GitHubHost`] talks to GitHub; [`crate::fakes::MemoryHost`]
//! serves fixed data for tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ChangeRequest, Commit, Page, PageCursor, Release, RepoRef, Repository};

/// Failures reported by a host implementation.
#[derive(Debug, Error)]
pub enum HostError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The host answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// The API root cannot be turned into request URLs.
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Read-only view of a source-hosting API.
///
/// Paginated operations take a 1-based cursor and a page size and report the
/// next cursor, if any, in host order.
#[async_trait]
pub trait SourceHost: Send + Sync {
    async fn get_repository(&self, repo: &RepoRef) -> HostResult<Repository>;

    /// Closed pull requests, newest first as reported by the host.
    async fn list_change_requests(
        &self,
        repo: &RepoRef,
        page: PageCursor,
        page_size: u32,
    ) -> HostResult<Page<ChangeRequest>>;

    async fn list_change_request_commits(
        &self,
        repo: &RepoRef,
        number: u64,
        page: PageCursor,
        page_size: u32,
    ) -> HostResult<Page<Commit>>;

    /// `Ok(None)` when the repository has never published a release.
    async fn get_latest_release(&self, repo: &RepoRef) -> HostResult<Option<Release>>;

    /// Commits reachable from `head` but not from `base`.
    async fn compare_commits(
        &self,
        repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> HostResult<Vec<Commit>>;
}
