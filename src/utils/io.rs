//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

fn io_error(e: std::io::Error, operation: &str, path: &Path) -> Error {
    Error::internal_io(
        format!("{}: {}", path.display(), e),
        Some(operation.to_string()),
    )
}

/// Read raw file bytes.
pub fn read_bytes(path: &Path, operation: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| io_error(e, operation, path))
}

/// Read file contents as UTF-8 text.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| io_error(e, operation, path))
}

/// Write content to file, truncating any previous content.
pub fn write_file(path: &Path, content: &str, operation: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| io_error(e, operation, path))
}

pub fn create_dir_all(path: &Path, operation: &str) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| io_error(e, operation, path))
}

pub fn copy_file(from: &Path, to: &Path, operation: &str) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| io_error(e, operation, from))
}

/// Rename without overwriting: fails if `to` already exists.
pub fn rename_new(from: &Path, to: &Path, operation: &str) -> Result<()> {
    if to.exists() {
        return Err(Error::internal_io(
            format!("{}: rename target already exists", to.display()),
            Some(operation.to_string()),
        ));
    }
    fs::rename(from, to).map_err(|e| io_error(e, operation, from))
}

/// Recursively remove a directory. A missing directory is not an error.
pub fn remove_dir_all(path: &Path, operation: &str) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(e, operation, path)),
    }
}
