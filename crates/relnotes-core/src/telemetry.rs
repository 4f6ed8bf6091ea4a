//! Log output for the `relnotes` binary.
//!
//! stdout is reserved for the release notes, so every log line goes to
//! stderr. Without `RUST_LOG`, the requested level applies to relnotes itself
//! and the HTTP stack stays at `warn`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Default filter directives for `level`.
fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,relnotes={level},relnotes_core={level}")
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let output = if json {
        stderr.json().boxed()
    } else {
        stderr.boxed()
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .ok();
}
