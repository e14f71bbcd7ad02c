//! Snapshot file storage.
//!
//! Snapshots live in a `__snapshot__` directory next to the values file they
//! belong to (or inside the chart directory for the default-values case):
//!
//! ```text
//! chart/__snapshot__/default.snap        # no values file
//! chart/test/__snapshot__/ha.yaml.snap   # chart/test/ha.yaml
//! chart/test/__snapshot__/ha.yml.snap    # chart/test/ha.yml
//! ```
//!
//! The full values file name is kept so `ha.yaml` and `ha.yml` in one
//! directory never share a snapshot.
//!
//! Writes go through a temp file in the same directory followed by a
//! rename, so readers never see a half-written snapshot.

use crate::error::{Result, SnapError};
use crate::util::write_atomic;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default name of the directory holding snapshots.
pub const DEFAULT_SNAPSHOT_DIR: &str = "__snapshot__";
/// Extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "snap";
/// File stem of the snapshot for the default-values case.
pub const DEFAULT_SNAPSHOT_STEM: &str = "default";

/// Maps test cases to snapshot files and reads/writes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStore {
    dir_name: String,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_DIR)
    }
}

impl SnapshotStore {
    #[must_use]
    pub fn new(dir_name: impl Into<String>) -> Self {
        Self {
            dir_name: dir_name.into(),
        }
    }

    /// Snapshot location for a chart and optional values file.
    ///
    /// Pure: the same inputs always give the same path, and distinct values
    /// files in one directory always get distinct paths. The default-values
    /// location is never shared with a named values file: names that would
    /// collide with it (`default`, `default_`, ...) get one more `_`.
    #[must_use]
    pub fn resolve(&self, chart: &Path, values: Option<&Path>) -> PathBuf {
        let Some(values) = values else {
            return chart
                .join(&self.dir_name)
                .join(format!("{DEFAULT_SNAPSHOT_STEM}.{SNAPSHOT_EXTENSION}"));
        };

        let parent = values.parent().unwrap_or_else(|| Path::new(""));
        let mut name = values
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.trim_end_matches('_') == DEFAULT_SNAPSHOT_STEM {
            name.push('_');
        }
        parent
            .join(&self.dir_name)
            .join(format!("{name}.{SNAPSHOT_EXTENSION}"))
    }

    /// Read a stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::SnapshotNotFound`] if no snapshot exists and
    /// [`SnapError::Storage`] for any other I/O failure.
    pub fn read(&self, location: &Path) -> Result<String> {
        match fs::read_to_string(location) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SnapError::SnapshotNotFound {
                path: location.to_path_buf(),
            }),
            Err(e) => Err(SnapError::storage("read", location, e)),
        }
    }

    /// Write (create or overwrite) a snapshot, creating its directory.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Storage`] if the directory or file cannot be
    /// written.
    pub fn write(&self, location: &Path, text: &str) -> Result<()> {
        write_atomic(location, text.as_bytes())
            .map_err(|e| SnapError::storage("write", location, e))?;
        debug!(path = %location.display(), bytes = text.len(), "Wrote snapshot");
        Ok(())
    }

    /// Delete a snapshot. A missing snapshot is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Storage`] if an existing snapshot cannot be
    /// removed.
    pub fn delete(&self, location: &Path) -> Result<()> {
        match fs::remove_file(location) {
            Ok(()) => {
                debug!(path = %location.display(), "Deleted snapshot");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapError::storage("delete", location, e)),
        }
    }
}
