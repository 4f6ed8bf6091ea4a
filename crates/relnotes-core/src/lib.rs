//! relnotes core library
//!
//! Builds plain-text release notes from a repository's merged pull requests.
//!
//! Pull requests are walked newest first. A run ends when it reaches a
//! configured pull request number, when (with `since_latest_release`) it meets
//! the first pull request with no commits newer than the latest release, or
//! when the host has no more pages.
//!
//! ```rust,ignore
//! use relnotes_core::{build_release_notes, CancelSignal, GitHubHost, NotesConfig};
//!
//! let config = NotesConfig::new("acme", "widgets").with_token("ghp_...");
//! let host = GitHubHost::from_config(&config)?;
//! build_release_notes(&host, &config, &mut std::io::stdout(), CancelSignal::new()).await?;
//! ```

pub mod boundary;
pub mod cancel;
pub mod config;
pub mod error;
pub mod fakes;
pub mod fingerprint;
pub mod github;
pub mod host;
pub mod model;
pub mod orchestrator;
pub mod pager;
pub mod processor;
pub mod render;
pub mod telemetry;

pub use boundary::{Boundary, BoundaryResolver, LazyBoundary};
pub use cancel::CancelSignal;
pub use config::{NotesConfig, DEFAULT_API_URL};
pub use error::{ReleaseNotesError, Result};
pub use fingerprint::{fingerprint, fingerprint_set};
pub use github::GitHubHost;
pub use host::{HostError, HostResult, SourceHost};
pub use model::{
    ChangeRequest, Commit, Page, PageCursor, Release, RepoRef, Repository, TreeFingerprint,
    PAGE_SIZE,
};
pub use orchestrator::{build_release_notes, build_release_notes_with_boundary, RunSummary};
pub use pager::{ChangeRequestPages, CommitPages, PageSource, PageWalker};
pub use processor::{ChangeRequestProcessor, Outcome, SkipReason, StopPolicy, StopReason};
pub use render::{render_change_request, summarize_message, RenderOptions};
pub use telemetry::init_tracing;

/// relnotes version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
