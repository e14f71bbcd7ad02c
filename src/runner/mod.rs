//! Test orchestration.
//!
//! One test case per values file (or a single default-values case). Every
//! case runs on its own thread through render → normalize → compare (or
//! update) and ends in exactly one terminal state. The first failing case
//! cancels the shared token and the others stop at their next checkpoint
//! as `Failed(Cancelled)`; with `fail_fast` off every case runs to the end.

use crate::compare::compare;
use crate::config::SnapConfig;
use crate::error::{Result, SnapError};
use crate::model::{TestCase, TestSpec, case_label};
use crate::normalize::normalize;
use crate::render::{RenderRequest, Renderer};
use crate::snapshot::SnapshotStore;
use crate::util::CancellationToken;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

/// Key of the test metadata block inside a values file.
pub const TEST_SPEC_KEY: &str = "testSpec";

/// Lifecycle of a test case.
#[derive(Debug, Default)]
pub enum TestState {
    #[default]
    Pending,
    Running,
    Passed,
    Failed(SnapError),
}

impl TestState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed(_) => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed(_))
    }
}

/// Result of one test case.
#[derive(Debug)]
pub struct CaseOutcome {
    pub chart: PathBuf,
    pub values: Option<PathBuf>,
    /// `testSpec.desc`, when the values file had one.
    pub desc: Option<String>,
    /// Resolved snapshot location, once known.
    pub snapshot: Option<PathBuf>,
    pub state: TestState,
    /// Fragments snapshotted as unknown resources.
    pub unrecognized: usize,
    /// Whether the snapshot file was (re)written.
    pub updated: bool,
}

impl CaseOutcome {
    fn new(chart: &Path, values: Option<&Path>) -> Self {
        Self {
            chart: chart.to_path_buf(),
            values: values.map(Path::to_path_buf),
            desc: None,
            snapshot: None,
            state: TestState::Pending,
            unrecognized: 0,
            updated: false,
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        case_label(&self.chart, self.values.as_deref())
    }

    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.state, TestState::Passed)
    }

    #[must_use]
    pub const fn error(&self) -> Option<&SnapError> {
        match &self.state {
            TestState::Failed(err) => Some(err),
            _ => None,
        }
    }

    fn transition(&mut self, next: TestState) {
        debug!(
            case = %self.label(),
            from = self.state.as_str(),
            to = next.as_str(),
            "Test case state change"
        );
        self.state = next;
    }

    /// JSON form used by `--json`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "chart": self.chart.display().to_string(),
            "values": self.values.as_ref().map(|v| v.display().to_string()),
            "desc": self.desc,
            "snapshot": self.snapshot.as_ref().map(|s| s.display().to_string()),
            "status": self.state.as_str(),
            "unrecognized": self.unrecognized,
            "updated": self.updated,
        });
        if let Some(err) = self.error() {
            out["error"] = err.to_json();
        }
        out
    }
}

/// All case outcomes of a run, in discovery order.
#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<CaseOutcome>,
}

impl Report {
    /// True only if every case passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(CaseOutcome::passed)
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "passed": self.all_passed(),
            "total": self.outcomes.len(),
            "passed_count": self.passed_count(),
            "cases": self.outcomes.iter().map(CaseOutcome::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Hooks for presenting progress; both default to doing nothing.
pub trait Observer: Sync {
    fn case_started(&self, _label: &str) {}
    fn case_finished(&self, _outcome: &CaseOutcome) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Observer for Silent {}

/// Expand `--values` inputs into one entry per test case.
///
/// No inputs gives a single default-values case. Directories contribute
/// their `*.yaml`/`*.yml` files (non-recursive, sorted). Paths that do not
/// exist are kept so the case can fail with `InputNotFound` on its own.
/// A file reached twice (repeated `-f`, or as a file and through its
/// directory) yields one case, at its first position.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed or holds no values
/// files.
pub fn discover_values(inputs: &[PathBuf]) -> Result<Vec<Option<PathBuf>>> {
    if inputs.is_empty() {
        return Ok(vec![None]);
    }

    let mut cases = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            cases.push(Some(input.clone()));
            continue;
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(input)? {
            let path = entry?.path();
            if path.is_file() && is_values_file(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(SnapError::NoValuesFiles { dir: input.clone() });
        }
        files.sort();
        debug!(dir = %input.display(), count = files.len(), "Discovered values files");
        cases.extend(files.into_iter().map(Some));
    }

    let mut seen = HashSet::new();
    cases.retain(|values| {
        let Some(path) = values else {
            return true;
        };
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        let first = seen.insert(key);
        if !first {
            debug!(values = %path.display(), "Skipping duplicate values file");
        }
        first
    });
    Ok(cases)
}

fn is_values_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Read the `testSpec` block of a values file.
///
/// A file without one (or an empty file) yields the default spec.
///
/// # Errors
///
/// Returns [`SnapError::InputNotFound`] if the file does not exist and
/// [`SnapError::InvalidTestSpec`] if the file or block is malformed.
pub fn load_test_spec(values: &Path) -> Result<TestSpec> {
    let text = match fs::read_to_string(values) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SnapError::InputNotFound {
                path: values.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let invalid = |reason: String| SnapError::InvalidTestSpec {
        path: values.to_path_buf(),
        reason,
    };

    let document: serde_yaml::Value =
        serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    let spec = match document.as_mapping().and_then(|m| m.get(TEST_SPEC_KEY)) {
        None | Some(serde_yaml::Value::Null) => TestSpec::default(),
        Some(block) => {
            serde_yaml::from_value(block.clone()).map_err(|e| invalid(e.to_string()))?
        }
    };
    Ok(spec)
}

/// Drives every test case of a run.
pub struct Orchestrator<'a, R: Renderer> {
    config: &'a SnapConfig,
    renderer: &'a R,
    store: SnapshotStore,
    cancel: CancellationToken,
}

impl<'a, R: Renderer> Orchestrator<'a, R> {
    #[must_use]
    pub fn new(config: &'a SnapConfig, renderer: &'a R) -> Self {
        Self {
            config,
            renderer,
            store: SnapshotStore::new(config.snapshot_dir.clone()),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every test case in parallel and collect their outcomes.
    ///
    /// # Errors
    ///
    /// Returns an error only when the set of test cases cannot be built;
    /// per-case failures are reported in the [`Report`].
    pub fn run(&self, observer: &dyn Observer) -> Result<Report> {
        for (key, value) in self.config.entries() {
            debug!(key, value = %value, "option");
        }

        let inputs = discover_values(&self.config.values)?;
        info!(cases = inputs.len(), update = self.config.update_snapshot, "Running snapshot tests");

        let outcomes = thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|values| {
                    let values = values.as_deref();
                    observer.case_started(&case_label(&self.config.chart, values));
                    let handle = scope.spawn(move || self.run_case(values));
                    (values, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(values, handle)| {
                    let outcome = handle.join().unwrap_or_else(|_| {
                        let mut outcome = CaseOutcome::new(&self.config.chart, values);
                        outcome.state = TestState::Failed(SnapError::Internal {
                            reason: "test case task panicked".to_string(),
                        });
                        outcome
                    });
                    observer.case_finished(&outcome);
                    outcome
                })
                .collect()
        });

        Ok(Report { outcomes })
    }

    /// Run one case to a terminal state.
    fn run_case(&self, values: Option<&Path>) -> CaseOutcome {
        let mut outcome = CaseOutcome::new(&self.config.chart, values);
        outcome.transition(TestState::Running);

        match self.execute(values, &mut outcome) {
            Ok(()) => {
                info!(case = %outcome.label(), "Snapshot matched");
                outcome.transition(TestState::Passed);
            }
            Err(err) => {
                warn!(case = %outcome.label(), error = %err.summary(), "Test case failed");
                if self.config.fail_fast && !matches!(err, SnapError::Cancelled) {
                    self.cancel.cancel();
                }
                outcome.transition(TestState::Failed(err));
            }
        }
        debug_assert!(outcome.state.is_terminal());
        outcome
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SnapError::Cancelled);
        }
        Ok(())
    }

    fn execute(&self, values: Option<&Path>, outcome: &mut CaseOutcome) -> Result<()> {
        self.checkpoint()?;

        let case = self.resolve_case(values)?;
        outcome.desc.clone_from(&case.spec.desc);
        outcome.snapshot = Some(case.snapshot.clone());
        if let Some(desc) = &case.spec.desc {
            info!(case = %case.label(), desc = %desc, "Test case");
        }

        let request = RenderRequest {
            chart: &case.chart,
            release_name: &self.config.release_name,
            namespace: &self.config.namespace,
            values: case.values.as_deref(),
            extra_args: &self.config.extra_args,
        };
        let output = self.renderer.render(&request, &self.cancel)?;
        self.checkpoint()?;

        let normalized = normalize(&output.combined(), &case.spec)?;
        outcome.unrecognized = normalized.unrecognized.len();
        for fragment in &normalized.unrecognized {
            warn!(case = %case.label(), "{fragment}");
        }
        debug!(
            case = %case.label(),
            resources = normalized.resources,
            masked = normalized.masked_fields,
            "Normalized rendered output"
        );
        self.checkpoint()?;

        if self.config.update_snapshot {
            self.store.delete(&case.snapshot)?;
            self.store.write(&case.snapshot, &normalized.text)?;
            outcome.updated = true;
            info!(path = %case.snapshot.display(), "Updated snapshot");
            return Ok(());
        }

        let expected = self.store.read(&case.snapshot)?;
        let comparison = compare(&expected, &normalized.text);
        if !comparison.matched {
            return Err(SnapError::SnapshotMismatch {
                path: case.snapshot,
                diff: comparison.diff,
            });
        }
        Ok(())
    }

    fn resolve_case(&self, values: Option<&Path>) -> Result<TestCase> {
        let spec = match values {
            Some(path) => load_test_spec(path)?,
            None => TestSpec::default(),
        };
        Ok(TestCase {
            chart: self.config.chart.clone(),
            values: values.map(Path::to_path_buf),
            snapshot: self.store.resolve(&self.config.chart, values),
            spec,
        })
    }
}
