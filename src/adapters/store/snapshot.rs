//! JSON snapshot files backing the in-memory stores

use crate::domain::{EdiError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads a snapshot, returning the default value when the file does not exist yet
pub(crate) fn read_snapshot<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let bytes = fs::read(path)
        .map_err(|e| EdiError::Store(format!("Failed to read snapshot {}: {}", path.display(), e)))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        EdiError::Store(format!("Corrupt snapshot {}: {}", path.display(), e))
    })
}

/// Writes a snapshot atomically (temp file in the same directory, then rename)
pub(crate) fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.persist(path).map_err(|e| {
        EdiError::Store(format!(
            "Failed to write snapshot {}: {}",
            path.display(),
            e.error
        ))
    })?;
    Ok(())
}
