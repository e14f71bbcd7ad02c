//! Drives the `chartsnap` binary against a fake `helm`.
//!
//! The fake reads what to print from a per-workspace `renders/` directory,
//! keyed by the file name of the `--values` argument (`default` when there
//! is none):
//!
//! - `<key>.out` is printed on stdout
//! - `<key>.err` is printed on stderr
//! - `<key>.fail` makes it exit 1
//! - `<key>.sleep` makes it hang for a minute before printing anything
//!
//! Every invocation appends its arguments to `renders/args.log`.

use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

const FAKE_HELM: &str = r#"#!/bin/sh
echo "$@" >> "$FAKE_HELM_RENDERS/args.log"
key=default
while [ $# -gt 0 ]; do
  case "$1" in
    --values) key=$(basename "$2"); shift 2 ;;
    *) shift ;;
  esac
done
dir="$FAKE_HELM_RENDERS"
if [ -f "$dir/$key.sleep" ]; then exec sleep 60; fi
if [ -f "$dir/$key.err" ]; then cat "$dir/$key.err" >&2; fi
if [ -f "$dir/$key.fail" ]; then exit 1; fi
cat "$dir/$key.out"
"#;

/// Written once, before any test spawns a process, so no child can inherit
/// a writable handle to it (which would make exec fail with ETXTBSY).
static FAKE_HELM_DIR: LazyLock<TempDir> = LazyLock::new(|| {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("fake helm dir");
    let path = dir.path().join("helm");
    fs::write(&path, FAKE_HELM).expect("write fake helm");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake helm");
    dir
});

fn fake_helm() -> PathBuf {
    FAKE_HELM_DIR.path().join("helm")
}

#[derive(Debug)]
pub struct SnapRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl SnapRun {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

pub struct SnapWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub chart: PathBuf,
    pub renders: PathBuf,
    pub log_dir: PathBuf,
}

impl SnapWorkspace {
    pub fn new() -> Self {
        let helm = fake_helm();
        assert!(helm.is_file());

        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let chart = root.join("app");
        let renders = root.join("renders");
        let log_dir = root.join("logs");
        for dir in [&chart, &renders, &log_dir] {
            fs::create_dir_all(dir).expect("workspace dir");
        }
        fs::write(chart.join("Chart.yaml"), "apiVersion: v2\nname: app\nversion: 0.1.0\n")
            .expect("Chart.yaml");
        Self {
            temp_dir,
            root,
            chart,
            renders,
            log_dir,
        }
    }

    /// Set what the fake helm prints on stdout for `key`.
    pub fn set_render(&self, key: &str, stdout: &str) {
        fs::write(self.renders.join(format!("{key}.out")), stdout).expect("write render");
    }

    /// Set what the fake helm prints on stderr for `key`.
    pub fn set_render_stderr(&self, key: &str, stderr: &str) {
        fs::write(self.renders.join(format!("{key}.err")), stderr).expect("write render stderr");
    }

    /// Make the fake helm fail for `key`.
    pub fn fail_render(&self, key: &str, stderr: &str) {
        self.set_render_stderr(key, stderr);
        fs::write(self.renders.join(format!("{key}.fail")), "").expect("write fail marker");
    }

    /// Make the fake helm hang for `key` until it is killed.
    pub fn hang_render(&self, key: &str) {
        fs::write(self.renders.join(format!("{key}.sleep")), "").expect("write sleep marker");
    }

    /// Write a values file relative to the workspace root.
    pub fn write_values(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("values dir");
        }
        fs::write(&path, contents).expect("write values");
        path
    }

    pub fn default_snapshot(&self) -> PathBuf {
        self.chart.join("__snapshot__").join("default.snap")
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
    }

    /// Arguments every helm invocation received, one line per call.
    pub fn helm_calls(&self) -> Vec<String> {
        fs::read_to_string(self.renders.join("args.log"))
            .unwrap_or_default()
            .lines()
            .map(ToString::to_string)
            .collect()
    }
}

/// Run `chartsnap -c <chart> --helm-path <fake> <args...>`.
pub fn run_chartsnap<I, S>(workspace: &SnapWorkspace, args: I, label: &str) -> SnapRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("chartsnap"));
    cmd.current_dir(&workspace.root);
    cmd.arg("-c").arg(&workspace.chart);
    cmd.arg("--helm-path").arg(fake_helm());
    cmd.args(args);
    for var in [
        "CHARTSNAP_CHART",
        "CHARTSNAP_RELEASE_NAME",
        "CHARTSNAP_NAMESPACE",
        "CHARTSNAP_HELM_PATH",
        "CHARTSNAP_TIMEOUT",
        "CHARTSNAP_SNAPSHOT_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("FAKE_HELM_RENDERS", &workspace.renders);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "chartsnap=debug");
    cmd.env("RUST_BACKTRACE", "1");

    let start = Instant::now();
    let output = cmd.output().expect("run chartsnap");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        SystemTime::now(),
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    SnapRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// Everything from the first `{` onward.
pub fn extract_json_payload(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    stdout.trim().to_string()
}
