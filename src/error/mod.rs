//! Error types and handling for `chartsnap`.
//!
//! Every failure a test case can hit is a variant of [`SnapError`]. The
//! orchestrator catches them at the test-case boundary and turns them into a
//! `Failed` outcome, so one broken case never aborts its siblings.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Stable machine-readable codes via [`ErrorCode`] for `--json` output
//! - Provides recovery hints for user-facing errors

use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `chartsnap` operations.
#[derive(Error, Debug)]
pub enum SnapError {
    // === Input Errors ===
    /// A requested values file or directory does not exist.
    #[error("values file '{path}' not found")]
    InputNotFound { path: PathBuf },

    /// A values directory contained no values files.
    #[error("no values files (*.yaml, *.yml) found in '{dir}'")]
    NoValuesFiles { dir: PathBuf },

    /// The `testSpec` block of a values file could not be understood.
    #[error("invalid testSpec in '{path}': {reason}")]
    InvalidTestSpec { path: PathBuf, reason: String },

    // === Render Errors ===
    /// The renderer reported failure.
    #[error("'helm template' command failed: {reason}")]
    RenderFailure { reason: String },

    /// The renderer did not finish before its deadline.
    #[error("'helm template' command timed out after {seconds}s")]
    RenderTimeout { seconds: u64 },

    /// Work was abandoned because the run was cancelled.
    #[error("cancelled")]
    Cancelled,

    // === Snapshot Errors ===
    /// No baseline snapshot exists for a test case.
    #[error("snapshot not found at '{path}'")]
    SnapshotNotFound { path: PathBuf },

    /// Rendered output differs from the stored snapshot.
    #[error("snapshot does not match '{path}'\n{diff}")]
    SnapshotMismatch { path: PathBuf, diff: String },

    /// Reading, writing or deleting a snapshot failed.
    #[error("failed to {operation} snapshot '{path}': {source}")]
    Storage {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A test case task ended without producing a verdict.
    #[error("internal error: {reason}")]
    Internal { reason: String },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or emitting error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Machine-readable error codes.
///
/// These codes are stable and end up in the `--json` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InputNotFound,
    NoValuesFiles,
    InvalidTestSpec,
    RenderFailure,
    RenderTimeout,
    Cancelled,
    SnapshotNotFound,
    SnapshotMismatch,
    StorageFailure,
    InternalError,
    IoError,
    JsonError,
    YamlError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InputNotFound => "INPUT_NOT_FOUND",
            Self::NoValuesFiles => "NO_VALUES_FILES",
            Self::InvalidTestSpec => "INVALID_TEST_SPEC",
            Self::RenderFailure => "RENDER_FAILURE",
            Self::RenderTimeout => "RENDER_TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::SnapshotNotFound => "SNAPSHOT_NOT_FOUND",
            Self::SnapshotMismatch => "SNAPSHOT_MISMATCH",
            Self::StorageFailure => "STORAGE_FAILURE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SnapError {
    /// Stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InputNotFound { .. } => ErrorCode::InputNotFound,
            Self::NoValuesFiles { .. } => ErrorCode::NoValuesFiles,
            Self::InvalidTestSpec { .. } => ErrorCode::InvalidTestSpec,
            Self::RenderFailure { .. } => ErrorCode::RenderFailure,
            Self::RenderTimeout { .. } => ErrorCode::RenderTimeout,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::SnapshotNotFound { .. } => ErrorCode::SnapshotNotFound,
            Self::SnapshotMismatch { .. } => ErrorCode::SnapshotMismatch,
            Self::Storage { .. } => ErrorCode::StorageFailure,
            Self::Internal { .. } => ErrorCode::InternalError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Yaml(_) => ErrorCode::YamlError,
        }
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::SnapshotNotFound { .. } => {
                Some("Run with --update-snapshot (-u) to create the snapshot")
            }
            Self::SnapshotMismatch { .. } => {
                Some("If the change is intended, run with --update-snapshot (-u)")
            }
            Self::InputNotFound { .. } => Some("Check the --values (-f) path"),
            Self::InvalidTestSpec { .. } => {
                Some("testSpec.dynamicFields[].jsonPath entries must start with '/'")
            }
            Self::RenderTimeout { .. } => Some("Raise --timeout or check the chart"),
            _ => None,
        }
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }

    /// Wrap an I/O error from a snapshot operation.
    #[must_use]
    pub fn storage(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Short, single-line description without an attached diff.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::SnapshotMismatch { path, .. } => {
                format!("snapshot does not match '{}'", path.display())
            }
            other => other.to_string(),
        }
    }

    /// Structured form for the `--json` report.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "code": self.code(),
            "message": self.summary(),
            "hint": self.suggestion(),
        });
        if let Self::SnapshotMismatch { diff, .. } = self {
            out["diff"] = Value::String(diff.clone());
        }
        out
    }
}

/// Result type using `SnapError`.
pub type Result<T> = std::result::Result<T, SnapError>;
