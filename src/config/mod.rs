//! Run configuration for `chartsnap`.
//!
//! Sources and precedence (highest wins):
//! 1. CLI flags
//! 2. Environment variables (`CHARTSNAP_*`, resolved by clap)
//! 3. Defaults
//!
//! The resolved [`SnapConfig`] is built once in `main` and handed by
//! reference to the orchestrator and renderer.

use crate::cli::Cli;
use crate::snapshot::DEFAULT_SNAPSHOT_DIR;
use std::path::PathBuf;
use std::time::Duration;

/// Default release name passed to `helm template`.
pub const DEFAULT_RELEASE_NAME: &str = "testrelease";
/// Default namespace passed to `helm template`.
pub const DEFAULT_NAMESPACE: &str = "testns";
/// Default helm binary.
pub const DEFAULT_HELM_PATH: &str = "helm";

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SnapConfig {
    /// Chart directory (or reference) passed to `helm template`.
    pub chart: PathBuf,
    /// Values files or directories; empty means default values only.
    pub values: Vec<PathBuf>,
    pub release_name: String,
    pub namespace: String,
    pub helm_path: PathBuf,
    /// Extra arguments appended to `helm template`.
    pub extra_args: Vec<String>,
    pub update_snapshot: bool,
    /// Cancel outstanding cases once one fails (on unless `--no-fail-fast`).
    pub fail_fast: bool,
    pub render_timeout: Option<Duration>,
    pub snapshot_dir: String,
    pub json: bool,
    pub debug: bool,
}

impl SnapConfig {
    /// Configuration for `chart` with every other setting at its default.
    #[must_use]
    pub fn new(chart: impl Into<PathBuf>) -> Self {
        Self {
            chart: chart.into(),
            values: Vec::new(),
            release_name: DEFAULT_RELEASE_NAME.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            helm_path: PathBuf::from(DEFAULT_HELM_PATH),
            extra_args: Vec::new(),
            update_snapshot: false,
            fail_fast: true,
            render_timeout: None,
            snapshot_dir: DEFAULT_SNAPSHOT_DIR.to_string(),
            json: false,
            debug: false,
        }
    }

    /// Build from parsed CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            chart: cli.chart.clone(),
            values: cli.values.clone(),
            release_name: cli.release_name.clone(),
            namespace: cli.namespace.clone(),
            helm_path: cli.helm_path.clone(),
            extra_args: cli.helm_args.clone(),
            update_snapshot: cli.update_snapshot,
            fail_fast: !cli.no_fail_fast,
            render_timeout: cli.timeout.map(Duration::from_secs),
            snapshot_dir: cli.snapshot_dir.clone(),
            json: cli.json,
            debug: cli.debug,
        }
    }

    /// Every setting as a key/value pair, for debug logging.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let values = self
            .values
            .iter()
            .map(|v| v.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("chart", self.chart.display().to_string()),
            ("values", values),
            ("release_name", self.release_name.clone()),
            ("namespace", self.namespace.clone()),
            ("helm_path", self.helm_path.display().to_string()),
            ("extra_args", self.extra_args.join(" ")),
            ("update_snapshot", self.update_snapshot.to_string()),
            ("fail_fast", self.fail_fast.to_string()),
            (
                "render_timeout",
                self.render_timeout
                    .map(|t| format!("{}s", t.as_secs()))
                    .unwrap_or_default(),
            ),
            ("snapshot_dir", self.snapshot_dir.clone()),
            ("json", self.json.to_string()),
            ("debug", self.debug.to_string()),
        ]
    }
}
