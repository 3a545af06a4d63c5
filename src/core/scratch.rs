//! Scratch tree ownership.
//!
//! The scratch tree lives from just after the build step until the end of
//! the run. `ScratchDir` removes it on drop, so every early return after
//! creation (copy, rename, rewrite or deploy failure) still cleans up.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::io;

/// Per-process scratch path under `root`.
pub fn path_for(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{}-{}", name, std::process::id()))
}

/// Delete a scratch tree left behind by an earlier run.
///
/// Returns whether anything was removed.
pub fn clear_leftover(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    log_status!("scratch", "Removing leftover {}", path.display());
    io::remove_dir_all(path, "remove leftover scratch tree")?;
    Ok(true)
}

/// Owned scratch directory, removed recursively on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(path: PathBuf) -> Result<Self> {
        clear_leftover(&path)?;
        io::create_dir_all(&path, "create scratch tree")?;
        // Canonical so prefix checks against the canonical project root hold.
        let path = path.canonicalize().unwrap_or(path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match io::remove_dir_all(&self.path, "remove scratch tree") {
            Ok(()) => log_status!("scratch", "Removed {}", self.path.display()),
            Err(e) => log_status!("scratch", "Failed to remove {}: {}", self.path.display(), e),
        }
    }
}
