//! Pull-based walking of paginated host collections.
//!
//! [`PageWalker`] hides the cursor loop so pull requests and their commits are
//! consumed the same way. A page is fetched only once every item of the
//! previous page has been handed out, and the first failing fetch ends the
//! walk with an error. Items already returned are not retracted.

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::debug;

use crate::cancel::CancelSignal;
use crate::error::{ReleaseNotesError, Result};
use crate::host::{HostResult, SourceHost};
use crate::model::{ChangeRequest, Commit, Page, PageCursor, RepoRef, PAGE_SIZE};

/// A paginated collection that can be fetched one page at a time.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Human-readable description of the fetch, used in error context.
    fn describe(&self, cursor: PageCursor) -> String;

    async fn fetch_page(&self, cursor: PageCursor) -> HostResult<Page<Self::Item>>;
}

/// Lazy iterator over every item of a [`PageSource`], in host order.
pub struct PageWalker<S: PageSource> {
    source: S,
    cancel: CancelSignal,
    buffered: VecDeque<S::Item>,
    next: Option<PageCursor>,
    pages_fetched: u32,
}

impl<S: PageSource> PageWalker<S> {
    pub fn new(source: S, cancel: CancelSignal) -> Self {
        Self {
            source,
            cancel,
            buffered: VecDeque::new(),
            next: Some(1),
            pages_fetched: 0,
        }
    }

    /// Next item, fetching the following page when the current one is drained.
    ///
    /// Returns `Ok(None)` once the host reports no further pages.
    pub async fn try_next(&mut self) -> Result<Option<S::Item>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }
            let Some(cursor) = self.next.take() else {
                return Ok(None);
            };

            self.cancel.check()?;
            let page = self
                .source
                .fetch_page(cursor)
                .await
                .map_err(|e| ReleaseNotesError::fetch(self.source.describe(cursor), e))?;

            self.pages_fetched += 1;
            debug!(
                page = cursor,
                items = page.items.len(),
                next = ?page.next,
                "fetched page"
            );
            self.next = page.next;
            self.buffered.extend(page.items);
        }
    }

    /// Drain every remaining page into a vector.
    pub async fn collect_all(mut self) -> Result<Vec<S::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next().await? {
            items.push(item);
        }
        Ok(items)
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }
}

/// Closed pull requests of a repository.
pub struct ChangeRequestPages<'a> {
    host: &'a dyn SourceHost,
    repo: &'a RepoRef,
}

impl<'a> ChangeRequestPages<'a> {
    pub fn new(host: &'a dyn SourceHost, repo: &'a RepoRef) -> Self {
        Self { host, repo }
    }
}

#[async_trait]
impl<'a> PageSource for ChangeRequestPages<'a> {
    type Item = ChangeRequest;

    fn describe(&self, cursor: PageCursor) -> String {
        format!("list pull requests for {} (page {cursor})", self.repo)
    }

    async fn fetch_page(&self, cursor: PageCursor) -> HostResult<Page<ChangeRequest>> {
        self.host
            .list_change_requests(self.repo, cursor, PAGE_SIZE)
            .await
    }
}

/// Commits of a single pull request.
pub struct CommitPages<'a> {
    host: &'a dyn SourceHost,
    repo: &'a RepoRef,
    number: u64,
}

impl<'a> CommitPages<'a> {
    pub fn new(host: &'a dyn SourceHost, repo: &'a RepoRef, number: u64) -> Self {
        Self { host, repo, number }
    }
}

#[async_trait]
impl<'a> PageSource for CommitPages<'a> {
    type Item = Commit;

    fn describe(&self, cursor: PageCursor) -> String {
        format!(
            "list commits for {}#{} (page {cursor})",
            self.repo, self.number
        )
    }

    async fn fetch_page(&self, cursor: PageCursor) -> HostResult<Page<Commit>> {
        self.host
            .list_change_request_commits(self.repo, self.number, cursor, PAGE_SIZE)
            .await
    }
}
