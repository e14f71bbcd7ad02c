//! CLI definitions.

use crate::config::{DEFAULT_HELM_PATH, DEFAULT_NAMESPACE, DEFAULT_RELEASE_NAME};
use crate::snapshot::DEFAULT_SNAPSHOT_DIR;
use clap::Parser;
use std::path::PathBuf;

const LONG_ABOUT: &str = "\
Snapshot testing for Helm charts.

Each values file is a test case. `helm template` output is normalized and
compared with a snapshot stored in a `__snapshot__` directory next to the
values file (or in the chart directory when no values file is given).

A values file may carry a `testSpec` block that describes the case and masks
fields whose rendered value changes on every run:

  testSpec:
    desc: only required values and the rest is default
    dynamicFields:
      - apiVersion: v1
        kind: Secret
        name: app-auth
        jsonPath:
          - /data/COOKIE_HASHKEY
          - /data/COOKIE_BLOCKKEY";

const AFTER_HELP: &str = "\
Examples:
  # Snapshot with default values
  chartsnap -c YOUR_CHART

  # Update snapshot files
  chartsnap -c YOUR_CHART -u

  # Snapshot every values file in a directory
  chartsnap -c YOUR_CHART -f YOUR_TEST_VALUES_DIRECTORY

  # Pass extra flags to 'helm template'
  chartsnap -c YOUR_CHART -f YOUR_TEST_VALUES_FILE -- --skip-tests";

/// Snapshot testing tool for Helm charts
#[derive(Parser, Debug)]
#[command(name = "chartsnap", author, version, about, long_about = LONG_ABOUT, after_help = AFTER_HELP)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Chart passed to 'helm template RELEASE_NAME CHART'
    #[arg(short, long, env = "CHARTSNAP_CHART")]
    pub chart: PathBuf,

    /// Test values file or directory (repeatable). A directory runs every *.yaml/*.yml in it
    #[arg(short = 'f', long)]
    pub values: Vec<PathBuf>,

    /// Update snapshot files instead of comparing
    #[arg(short, long)]
    pub update_snapshot: bool,

    /// Release name passed to 'helm template'
    #[arg(long, default_value = DEFAULT_RELEASE_NAME, env = "CHARTSNAP_RELEASE_NAME")]
    pub release_name: String,

    /// Namespace passed to 'helm template --namespace'
    #[arg(long, default_value = DEFAULT_NAMESPACE, env = "CHARTSNAP_NAMESPACE")]
    pub namespace: String,

    /// Path to the helm binary
    #[arg(long, default_value = DEFAULT_HELM_PATH, env = "CHARTSNAP_HELM_PATH")]
    pub helm_path: PathBuf,

    /// Abort a 'helm template' run after this many seconds
    #[arg(long, value_name = "SECONDS", env = "CHARTSNAP_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Keep running the other test cases after one fails
    #[arg(long)]
    pub no_fail_fast: bool,

    /// Name of the directory snapshots are stored in
    #[arg(long, default_value = DEFAULT_SNAPSHOT_DIR, env = "CHARTSNAP_SNAPSHOT_DIR")]
    pub snapshot_dir: String,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Debug logging (same as -v)
    #[arg(long)]
    pub debug: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Extra arguments for 'helm template' (after --)
    #[arg(last = true)]
    pub helm_args: Vec<String>,
}
