//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ReleaseNotesError, Result};
use crate::model::RepoRef;
use crate::processor::StopPolicy;
use crate::render::RenderOptions;

/// Public GitHub REST API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Configuration for one release notes run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Organization or user owning the repository. Required.
    pub org: String,
    /// Repository name. Required.
    pub repo: String,
    /// API access token (optional for public repositories).
    pub github_token: Option<String>,
    /// Pull request number to stop at, exclusive.
    pub stop_at: Option<u64>,
    /// List each pull request's commits under it.
    pub include_commits: bool,
    /// Only include pull requests merged since the latest release.
    pub since_latest_release: bool,
    /// Prefix each entry with the pull request author.
    pub include_author: bool,
    /// API root, for GitHub Enterprise installations.
    pub api_url: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        NotesConfig {
            org: String::new(),
            repo: String::new(),
            github_token: None,
            stop_at: None,
            include_commits: false,
            since_latest_release: false,
            include_author: false,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl NotesConfig {
    pub fn new(org: &str, repo: &str) -> Self {
        NotesConfig {
            org: org.to_string(),
            repo: repo.to_string(),
            ..Default::default()
        }
    }

    /// Set the API access token.
    pub fn with_token(mut self, token: &str) -> Self {
        self.github_token = Some(token.to_string());
        self
    }

    /// Reject configurations that cannot start a run.
    pub fn validate(&self) -> Result<()> {
        if self.org.trim().is_empty() {
            return Err(ReleaseNotesError::Config(
                "organization is required".to_string(),
            ));
        }
        if self.repo.trim().is_empty() {
            return Err(ReleaseNotesError::Config(
                "repository is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(self.org.clone(), self.repo.clone())
    }

    pub fn stop_policy(&self) -> StopPolicy {
        StopPolicy {
            at_number: self.stop_at,
            at_release_boundary: self.since_latest_release,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            include_commits: self.include_commits,
            include_author: self.include_author,
        }
    }
}
