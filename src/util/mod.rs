//! Shared utilities for `chartsnap`.
//!
//! - Atomic file writes (temp file -> rename)
//! - Cooperative cancellation shared between test case tasks

mod cancel;

pub use cancel::CancellationToken;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write `contents` to `path` atomically.
///
/// The data goes to a hidden temp file in the target directory, is synced,
/// and is then renamed over `path`. Parent directories are created.
///
/// # Errors
///
/// Returns an error if the directory, the temp file, or the rename fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let temp_path = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

    let result = (|| {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        writer.write_all(contents)?;
        writer.flush()?;
        writer.into_inner().map_err(io::IntoInnerError::into_error)?.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
