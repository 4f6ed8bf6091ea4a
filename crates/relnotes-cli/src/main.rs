//! relnotes - release notes from merged GitHub pull requests
//!
//! Writes one line per merged pull request to stdout, newest first:
//!
//! ```text
//! - PR #10 Fix bug
//!     - abc123 fix
//! ```
//!
//! Exit status is 2 for configuration errors and 1 for failures during the run.

use std::io::BufWriter;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use relnotes_core::{
    build_release_notes, init_tracing, CancelSignal, GitHubHost, NotesConfig, ReleaseNotesError,
    DEFAULT_API_URL,
};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "relnotes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build release notes from merged GitHub pull requests", long_about = None)]
struct Cli {
    /// Organization. (Required)
    #[arg(long)]
    org: Option<String>,

    /// Repo. (Required)
    #[arg(long)]
    repo: Option<String>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// PR number to stop at
    #[arg(long)]
    stop_at: Option<u64>,

    /// Include commit messages
    #[arg(long)]
    include_commits: bool,

    /// Stop at the first PR with no commits newer than the latest release
    #[arg(long)]
    since_latest_release: bool,

    /// Include the author of each PR
    #[arg(long)]
    include_author: bool,

    /// GitHub API root (GitHub Enterprise: https://HOST/api/v3)
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> NotesConfig {
        NotesConfig {
            org: self.org.unwrap_or_default(),
            repo: self.repo.unwrap_or_default(),
            github_token: self.github_token.filter(|token| !token.is_empty()),
            stop_at: self.stop_at,
            include_commits: self.include_commits,
            since_latest_release: self.since_latest_release,
            include_author: self.include_author,
            api_url: self.api_url,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    init_tracing(cli.json, level);

    match run(cli.into_config()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

/// 2 for configuration errors, 1 for everything else.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ReleaseNotesError>() {
        Some(e) if e.is_config() => 2,
        _ => 1,
    }
}

async fn run(config: NotesConfig) -> Result<()> {
    config.validate()?;

    let host = GitHubHost::from_config(&config).context("Failed to create GitHub client")?;

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; stopping before the next request");
            on_interrupt.cancel();
        }
    });

    let mut out = BufWriter::new(std::io::stdout().lock());
    let summary = build_release_notes(&host, &config, &mut out, cancel).await?;
    info!(
        emitted = summary.emitted,
        skipped = summary.skipped,
        stopped = ?summary.stopped,
        "done"
    );
    Ok(())
}
