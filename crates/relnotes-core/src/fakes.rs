//! In-memory [`SourceHost`] (testing only)
//!
//! `MemoryHost` serves a fixed snapshot of a repository, paginates it like the
//! real host, and counts every call so tests can assert how much traffic a run
//! generated.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::host::{HostError, HostResult, SourceHost};
use crate::model::{
    ChangeRequest, Commit, Page, PageCursor, Release, RepoRef, Repository, PAGE_SIZE,
};

/// A host call that [`MemoryHost`] can be told to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailPoint {
    Repository,
    ChangeRequestPage(PageCursor),
    Commits(u64),
    LatestRelease,
    Compare,
}

// ---------------------------------------------------------------------------
// MemoryHost
// ---------------------------------------------------------------------------

/// Snapshot-backed host. Pull requests are served in insertion order.
#[derive(Debug)]
pub struct MemoryHost {
    default_branch: String,
    release: Option<Release>,
    comparison: Vec<Commit>,
    change_requests: Vec<ChangeRequest>,
    commits: HashMap<u64, Vec<Commit>>,
    page_size: usize,
    fail_at: Option<FailPoint>,
    repository_calls: AtomicUsize,
    change_request_page_calls: AtomicUsize,
    commit_page_calls: AtomicUsize,
    release_calls: AtomicUsize,
    compare_calls: AtomicUsize,
    compared: Mutex<Vec<(String, String)>>,
}

impl MemoryHost {
    pub fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            release: None,
            comparison: Vec::new(),
            change_requests: Vec::new(),
            commits: HashMap::new(),
            page_size: PAGE_SIZE as usize,
            fail_at: None,
            repository_calls: AtomicUsize::new(0),
            change_request_page_calls: AtomicUsize::new(0),
            commit_page_calls: AtomicUsize::new(0),
            release_calls: AtomicUsize::new(0),
            compare_calls: AtomicUsize::new(0),
            compared: Mutex::new(Vec::new()),
        }
    }

    pub fn with_release(mut self, tag_name: &str) -> Self {
        self.release = Some(Release {
            tag_name: tag_name.to_string(),
        });
        self
    }

    /// Commits returned by any comparison.
    pub fn with_comparison(mut self, commits: Vec<Commit>) -> Self {
        self.comparison = commits;
        self
    }

    /// Append a pull request after the ones already added.
    pub fn with_change_request(mut self, change_request: ChangeRequest, commits: Vec<Commit>) -> Self {
        self.commits.insert(change_request.number, commits);
        self.change_requests.push(change_request);
        self
    }

    /// Serve smaller pages than the caller asks for.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn failing_at(mut self, point: FailPoint) -> Self {
        self.fail_at = Some(point);
        self
    }

    pub fn repository_calls(&self) -> usize {
        self.repository_calls.load(Ordering::SeqCst)
    }

    pub fn change_request_page_calls(&self) -> usize {
        self.change_request_page_calls.load(Ordering::SeqCst)
    }

    pub fn commit_page_calls(&self) -> usize {
        self.commit_page_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn compare_calls(&self) -> usize {
        self.compare_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.repository_calls()
            + self.change_request_page_calls()
            + self.commit_page_calls()
            + self.release_calls()
            + self.compare_calls()
    }

    /// `(base, head)` of every comparison requested so far.
    pub fn compared_refs(&self) -> Vec<(String, String)> {
        self.compared.lock().unwrap().clone()
    }

    fn check(&self, point: FailPoint) -> HostResult<()> {
        if self.fail_at.as_ref() == Some(&point) {
            return Err(HostError::Status {
                status: 500,
                body: format!("injected failure at {point:?}"),
            });
        }
        Ok(())
    }

    fn paginate<T: Clone>(&self, items: &[T], page: PageCursor, requested: u32) -> Page<T> {
        let size = self.page_size.min(requested.max(1) as usize);
        let start = (page.saturating_sub(1) as usize).saturating_mul(size);
        let end = start.saturating_add(size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        let next = (end < items.len()).then_some(page + 1);
        Page { items: slice, next }
    }
}

#[async_trait]
impl SourceHost for MemoryHost {
    async fn get_repository(&self, _repo: &RepoRef) -> HostResult<Repository> {
        self.repository_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailPoint::Repository)?;
        Ok(Repository {
            default_branch: self.default_branch.clone(),
        })
    }

    async fn list_change_requests(
        &self,
        _repo: &RepoRef,
        page: PageCursor,
        page_size: u32,
    ) -> HostResult<Page<ChangeRequest>> {
        self.change_request_page_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailPoint::ChangeRequestPage(page))?;
        Ok(self.paginate(&self.change_requests, page, page_size))
    }

    async fn list_change_request_commits(
        &self,
        _repo: &RepoRef,
        number: u64,
        page: PageCursor,
        page_size: u32,
    ) -> HostResult<Page<Commit>> {
        self.commit_page_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailPoint::Commits(number))?;
        let commits = self.commits.get(&number).map(Vec::as_slice).unwrap_or_default();
        Ok(self.paginate(commits, page, page_size))
    }

    async fn get_latest_release(&self, _repo: &RepoRef) -> HostResult<Option<Release>> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailPoint::LatestRelease)?;
        Ok(self.release.clone())
    }

    async fn compare_commits(
        &self,
        _repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> HostResult<Vec<Commit>> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailPoint::Compare)?;
        self.compared
            .lock()
            .unwrap()
            .push((base.to_string(), head.to_string()));
        Ok(self.comparison.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(number: u64) -> ChangeRequest {
        ChangeRequest {
            number,
            title: format!("PR {number}"),
            author: None,
            merged_at: None,
            base_branch: "main".to_string(),
        }
    }

    #[tokio::test]
    async fn test_paginates_with_next_cursor() {
        let host = MemoryHost::new("main")
            .with_change_request(pr(3), vec![])
            .with_change_request(pr(2), vec![])
            .with_change_request(pr(1), vec![])
            .with_page_size(2);
        let repo = RepoRef::new("acme", "widgets");

        let first = host.list_change_requests(&repo, 1, PAGE_SIZE).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next, Some(2));

        let second = host.list_change_requests(&repo, 2, PAGE_SIZE).await.unwrap();
        assert_eq!(second.items[0].number, 1);
        assert_eq!(second.next, None);
        assert_eq!(host.change_request_page_calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_injection_is_targeted() {
        let host = MemoryHost::new("main")
            .with_change_request(pr(1), vec![])
            .failing_at(FailPoint::Commits(1));
        let repo = RepoRef::new("acme", "widgets");

        assert!(host.list_change_requests(&repo, 1, PAGE_SIZE).await.is_ok());
        assert!(host
            .list_change_request_commits(&repo, 1, 1, PAGE_SIZE)
            .await
            .is_err());
    }
}
