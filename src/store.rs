//! Write-then-rename helpers for output files.
//!
//! Result records double as idempotency markers, so a record must never be
//! visible under its final name until its content is complete. Everything
//! is first written to `<name>.part` in the same directory and then renamed.

use std::path::{Path, PathBuf};

use crate::error::{OrcaError, Result};

/// Sibling path used while `path` is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Move a finished partial file into place.
pub fn commit(partial: &Path, path: &Path) -> Result<()> {
    std::fs::rename(partial, path).map_err(|e| OrcaError::io(path, e))
}

/// Write `bytes` to `path` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(path);
    std::fs::write(&partial, bytes).map_err(|e| OrcaError::io(&partial, e))?;
    commit(&partial, path)
}

/// Persist a JSON value pretty-printed.
pub fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| OrcaError::io(path, e))
}
