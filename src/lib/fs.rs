//! Utilities for persisted JSON documents and content hashing.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::lib::errors::StateError;

/// Return the directory a file lives in, treating a bare file name as `.`.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> Result<(), StateError> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir).map_err(|source| StateError::CreateDir { path: dir, source })
}

/// Read a file that may be missing; `None` for missing or whitespace-only files.
pub fn read_optional_text(path: &Path) -> Result<Option<String>, StateError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| StateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_string()))
}

/// Serialize `payload` as pretty JSON with sorted keys and replace `path` atomically.
///
/// The document is written to a temporary file in the destination directory
/// and renamed over the target, so readers never observe a partial write.
pub fn write_json_atomic<T: Serialize>(path: &Path, payload: &T) -> Result<(), StateError> {
    // Routing through `Value` yields sorted object keys.
    let value = serde_json::to_value(payload).map_err(|source| StateError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rendered = serde_json::to_string_pretty(&value).map_err(|source| StateError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    rendered.push('\n');

    let dir = parent_dir(path);
    let io_error = |source| StateError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut handle = NamedTempFile::new_in(&dir).map_err(io_error)?;
    handle.write_all(rendered.as_bytes()).map_err(io_error)?;
    handle.as_file().sync_all().map_err(io_error)?;
    handle
        .persist(path)
        .map_err(|err| io_error(err.error))?;
    Ok(())
}

/// Return the SHA256 of a UTF-8 string as a hex string.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
