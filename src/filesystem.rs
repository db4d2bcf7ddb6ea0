//! Filesystem helpers for rewriting files in place.
//!
//! Manifests and sidecars are replaced through a temporary file created in
//! the same directory and renamed over the target, so an interrupted run
//! never leaves a half-written file behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Atomically replace `path` with `content`.
///
/// The permissions of an existing file are carried over to the new one.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Read a file that is known to exist, or `None` when it does not.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
