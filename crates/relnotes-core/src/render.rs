//! Plain-text formatting of release note entries.

use serde::{Deserialize, Serialize};

use crate::model::{ChangeRequest, Commit};

/// Longest commit summary kept before truncation, in characters.
pub const MAX_SUMMARY_CHARS: usize = 90;

const ELLIPSIS: &str = "...";

/// Presentation flags. They never change which pull requests are selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub include_commits: bool,
    pub include_author: bool,
}

/// First line of a commit message, cut to [`MAX_SUMMARY_CHARS`] and trimmed.
pub fn summarize_message(message: &str) -> String {
    let first_line = message.split('\n').next().unwrap_or_default();
    let summary = match first_line.char_indices().nth(MAX_SUMMARY_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &first_line[..cut]),
        None => first_line.to_string(),
    };
    summary.trim().to_string()
}

/// The entry for one pull request, including its trailing newline(s).
pub fn render_change_request(
    change_request: &ChangeRequest,
    commits: &[Commit],
    options: RenderOptions,
) -> String {
    let mut out = match change_request.author.as_deref() {
        Some(author) if options.include_author => format!(
            "- PR #{} - @{} - {}\n",
            change_request.number, author, change_request.title
        ),
        _ => format!("- PR #{} {}\n", change_request.number, change_request.title),
    };

    if options.include_commits {
        for commit in commits {
            out.push_str(&format!(
                "    - {} {}\n",
                commit.sha,
                summarize_message(&commit.message)
            ));
        }
        out.push('\n');
    }
    out
}
