//! Top-level release notes run.
//!
//! Walks closed pull requests newest first, hands each one to the
//! [`ChangeRequestProcessor`], and returns as soon as a stop rule fires or the
//! host runs out of pages. Any error ends the run; entries already written to
//! the sink stay written.

use std::io::Write;

use tracing::{info, info_span, Instrument};

use crate::boundary::{BoundaryResolver, LazyBoundary};
use crate::cancel::CancelSignal;
use crate::config::NotesConfig;
use crate::error::Result;
use crate::host::SourceHost;
use crate::pager::{ChangeRequestPages, PageWalker};
use crate::processor::{ChangeRequestProcessor, Outcome, StopReason};

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub emitted: usize,
    pub skipped: usize,
    /// `None` when every page was consumed.
    pub stopped: Option<StopReason>,
}

/// Write release notes for the configured repository to `out`.
///
/// The release boundary is resolved on first need, at most once.
pub async fn build_release_notes<W: Write + ?Sized>(
    host: &dyn SourceHost,
    config: &NotesConfig,
    out: &mut W,
    cancel: CancelSignal,
) -> Result<RunSummary> {
    config.validate()?;
    let repo = config.repo_ref();
    let boundary = LazyBoundary::new(BoundaryResolver::new(host, &repo, cancel.clone()));
    build_release_notes_with_boundary(host, config, &boundary, out, cancel).await
}

/// Like [`build_release_notes`], with the boundary supplied by the caller.
pub async fn build_release_notes_with_boundary<W: Write + ?Sized>(
    host: &dyn SourceHost,
    config: &NotesConfig,
    boundary: &LazyBoundary<'_>,
    out: &mut W,
    cancel: CancelSignal,
) -> Result<RunSummary> {
    config.validate()?;
    let repo = config.repo_ref();
    let span = info_span!("release_notes", repo = %repo);

    async move {
        let processor = ChangeRequestProcessor::new(
            host,
            &repo,
            config.stop_policy(),
            config.render_options(),
            cancel.clone(),
        );
        let mut change_requests = PageWalker::new(ChangeRequestPages::new(host, &repo), cancel);
        let mut summary = RunSummary::default();

        while let Some(change_request) = change_requests.try_next().await? {
            match processor.process(&change_request, boundary, out).await? {
                Outcome::Emitted => summary.emitted += 1,
                Outcome::Skipped(_) => summary.skipped += 1,
                Outcome::Stop(reason) => {
                    info!(?reason, "stopping");
                    summary.stopped = Some(reason);
                    break;
                }
            }
        }

        out.flush()?;
        info!(
            emitted = summary.emitted,
            skipped = summary.skipped,
            pages = change_requests.pages_fetched(),
            "release notes complete"
        );
        Ok(summary)
    }
    .instrument(span)
    .await
}
