//! Rendering charts.
//!
//! The orchestrator only sees the [`Renderer`] trait; [`HelmRenderer`] runs
//! `helm template RELEASE CHART --namespace NS [--values FILE] [ARGS...]`.

use crate::config::DEFAULT_HELM_PATH;
use crate::error::{Result, SnapError};
use crate::util::CancellationToken;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Interval between child-process polls.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Everything needed to render one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest<'a> {
    pub chart: &'a Path,
    pub release_name: &'a str,
    pub namespace: &'a str,
    pub values: Option<&'a Path>,
    pub extra_args: &'a [String],
}

/// Text produced by a successful render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub stdout: String,
    pub stderr: String,
}

impl RenderOutput {
    /// Rendered documents followed by any diagnostics as an extra document.
    ///
    /// Diagnostics end up as unknown resources in the snapshot instead of
    /// being dropped.
    #[must_use]
    pub fn combined(&self) -> String {
        if self.stderr.trim().is_empty() {
            return self.stdout.clone();
        }
        let mut out = self.stdout.clone();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("---\n");
        out.push_str(&self.stderr);
        out
    }
}

/// Produces rendered text for a chart and values input.
pub trait Renderer: Sync {
    /// Render one test case.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::RenderFailure`] when rendering fails,
    /// [`SnapError::RenderTimeout`] when a deadline passes, and
    /// [`SnapError::Cancelled`] when `cancel` fires first.
    fn render(&self, request: &RenderRequest<'_>, cancel: &CancellationToken)
    -> Result<RenderOutput>;
}

/// Renders with the `helm` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmRenderer {
    pub helm_path: PathBuf,
    pub timeout: Option<Duration>,
}

impl HelmRenderer {
    #[must_use]
    pub fn new(helm_path: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            helm_path: helm_path.into(),
            timeout,
        }
    }

    /// Arguments passed to `helm`.
    #[must_use]
    pub fn command_args(request: &RenderRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "template".into(),
            request.release_name.into(),
            request.chart.as_os_str().to_os_string(),
            "--namespace".into(),
            request.namespace.into(),
        ];
        if let Some(values) = request.values {
            args.push("--values".into());
            args.push(values.as_os_str().to_os_string());
        }
        args.extend(request.extra_args.iter().map(OsString::from));
        args
    }

    fn wait(&self, child: &mut Child, cancel: &CancellationToken) -> Result<std::process::ExitStatus> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if cancel.is_cancelled() {
                kill(child);
                return Err(SnapError::Cancelled);
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    kill(child);
                    return Err(SnapError::RenderTimeout {
                        seconds: timeout.as_secs(),
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for HelmRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_HELM_PATH, None)
    }
}

impl Renderer for HelmRenderer {
    fn render(
        &self,
        request: &RenderRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<RenderOutput> {
        if cancel.is_cancelled() {
            return Err(SnapError::Cancelled);
        }

        let args = Self::command_args(request);
        debug!(helm = %self.helm_path.display(), ?args, "Running helm template");

        let mut child = Command::new(&self.helm_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SnapError::RenderFailure {
                reason: format!("failed to run '{}': {e}", self.helm_path.display()),
            })?;

        // Drain both pipes on their own threads so a chatty child cannot
        // block on a full pipe while we wait for it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait(&mut child, cancel);
        let stdout = collect(stdout, "stdout");
        let stderr = collect(stderr, "stderr");
        let status = status?;
        let (stdout, stderr) = (stdout?, stderr?);

        if !status.success() {
            return Err(SnapError::RenderFailure {
                reason: format!("{status}: {}", stderr.trim()),
            });
        }
        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "helm template wrote diagnostics");
        }
        Ok(RenderOutput { stdout, stderr })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

/// Wait for a pipe reader. A short read must not pass as complete output.
fn collect(handle: Option<thread::JoinHandle<io::Result<String>>>, stream: &str) -> Result<String> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    match handle.join() {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(SnapError::RenderFailure {
            reason: format!("failed to read helm {stream}: {e}"),
        }),
        Err(_) => Err(SnapError::RenderFailure {
            reason: format!("helm {stream} reader panicked"),
        }),
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(error = %e, "Failed to kill helm process");
    }
    let _ = child.wait();
}
