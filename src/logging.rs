//! Logging setup.
//!
//! Logs go to stderr so they never mix with banners or the `--json` report
//! on stdout. `RUST_LOG` overrides the level derived from the flags.

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Level implied by `-q`, `-v`/`-vv` and `--debug`.
#[must_use]
pub fn level_for(verbose: u8, quiet: bool, debug: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::WARN;
    }
    match (verbose, debug) {
        (0, false) => LevelFilter::INFO,
        (0 | 1, _) => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if `RUST_LOG` is malformed or a subscriber is already
/// installed.
pub fn init_logging(verbose: u8, quiet: bool, debug: bool) -> anyhow::Result<()> {
    let level = level_for(verbose, quiet, debug);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("invalid RUST_LOG filter")?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to install log subscriber")?;
    Ok(())
}

/// Subscriber for unit tests; safe to call from every test.
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("chartsnap=debug"))
        .with_test_writer()
        .try_init();
}
