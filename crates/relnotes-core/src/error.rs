//! Error taxonomy for release notes generation.

use thiserror::Error;

use crate::host::HostError;

/// Errors that abort a release notes run.
///
/// Output already written to the sink before the error is not retracted.
#[derive(Debug, Error)]
pub enum ReleaseNotesError {
    /// Required configuration is missing; raised before any network access.
    #[error("configuration error: {0}")]
    Config(String),

    /// A host call failed.
    #[error("{operation} failed")]
    Fetch {
        operation: String,
        #[source]
        source: HostError,
    },

    /// Boundary stopping was requested but the repository has no release.
    #[error("no release found for {repo}; cannot stop at the latest release")]
    NoReleaseFound { repo: String },

    /// A commit record lacks a field needed for boundary matching.
    #[error("malformed commit {sha}: {detail}")]
    MalformedData { sha: String, detail: String },

    /// The run was cancelled by the caller.
    #[error("release notes run cancelled")]
    Cancelled,

    /// Writing to the output sink failed.
    #[error("failed to write release notes")]
    Output(#[from] std::io::Error),
}

impl ReleaseNotesError {
    pub(crate) fn fetch(operation: impl Into<String>, source: HostError) -> Self {
        ReleaseNotesError::Fetch {
            operation: operation.into(),
            source,
        }
    }

    /// `true` for errors detected from configuration alone.
    pub fn is_config(&self) -> bool {
        matches!(self, ReleaseNotesError::Config(_))
    }
}

/// Result type for release notes operations.
pub type Result<T> = std::result::Result<T, ReleaseNotesError>;
