// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped handles over an application-private cache directory
//!
//! [`CacheDir`] replaces a mutable current-directory register with
//! immutable values: navigation returns a new handle and never touches
//! shared state, so an error mid-operation cannot strand a cursor at the
//! wrong depth. Every handle remembers the fixed top-level path, and
//! `parent` is clamped there.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Errors from cache directory operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid entry name: {0}")]
    InvalidName(String),
}

/// A handle on one directory inside a fixed cache subtree
#[derive(Debug, Clone)]
pub struct CacheDir {
    top: PathBuf,
    path: PathBuf,
}

impl CacheDir {
    /// Open the top-level cache directory, creating it if absent
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let top = root.as_ref().to_path_buf();
        fs::create_dir_all(&top)?;
        Ok(Self {
            path: top.clone(),
            top,
        })
    }

    /// Enter a subdirectory of this handle, creating it if absent
    pub fn child(&self, name: &str) -> Result<CacheDir, StoreError> {
        let path = self.path.join(checked_name(name)?);
        fs::create_dir_all(&path)?;
        Ok(CacheDir {
            top: self.top.clone(),
            path,
        })
    }

    /// Handle on an existing subdirectory; `None` when absent
    ///
    /// Unlike [`CacheDir::child`] this never creates directories, so
    /// read-only walks leave no empty directories behind.
    pub fn existing_child(&self, name: &str) -> Result<Option<CacheDir>, StoreError> {
        let path = self.path.join(checked_name(name)?);
        if path.is_dir() {
            Ok(Some(CacheDir {
                top: self.top.clone(),
                path,
            }))
        } else {
            Ok(None)
        }
    }

    /// The parent handle, clamped at the top level
    pub fn parent(&self) -> CacheDir {
        if self.path == self.top {
            return self.clone();
        }
        let path = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.top.clone());
        CacheDir {
            top: self.top.clone(),
            path,
        }
    }

    /// The top-level handle
    pub fn top_level(&self) -> CacheDir {
        CacheDir {
            top: self.top.clone(),
            path: self.top.clone(),
        }
    }

    /// Path of the directory this handle points at
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names directly under this directory, sorted, read fresh per call
    pub fn entries(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Delete every plain file directly under this directory whose age
    /// strictly exceeds `ttl`
    ///
    /// Age is measured from last modification to now; a file aged exactly
    /// `ttl` is retained. A zero `ttl` disables the sweep. Directories
    /// and files whose metadata cannot be read are left in place. Returns
    /// the number of files removed.
    pub fn sweep_stale(&self, ttl: Duration) -> Result<usize, StoreError> {
        if ttl.is_zero() {
            return Ok(0);
        }
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "sweep: unreadable metadata");
                    continue;
                }
            };
            if !meta.is_file() {
                continue;
            }
            let modified = match meta.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "sweep: no modification time");
                    continue;
                }
            };
            // A modification time in the future is not stale
            let age = match now.duration_since(modified) {
                Ok(age) => age,
                Err(_) => continue,
            };
            if age > ttl {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "sweep: delete failed")
                    }
                }
            }
        }
        Ok(removed)
    }

    /// Recursively remove a subtree under this handle
    ///
    /// `rel` may name a nested path such as `owner/key`. Removing a
    /// subtree that does not exist is not an error.
    pub fn delete_subtree(&self, rel: impl AsRef<Path>) -> Result<(), StoreError> {
        let target = self.path.join(checked_rel(rel.as_ref())?);
        match fs::remove_dir_all(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write raw bytes to a file directly under this directory
    pub fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        fs::write(self.path.join(checked_name(name)?), bytes)?;
        Ok(())
    }

    /// Read a file directly under this directory; `None` when absent
    pub fn read_file(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path.join(checked_name(name)?)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove everything under the top level and recreate it empty
    pub fn delete_all(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.top) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.top)?;
        Ok(())
    }
}

/// Reject names that would escape the directory
fn checked_name(name: &str) -> Result<&str, StoreError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Reject relative paths with non-normal components
fn checked_rel(rel: &Path) -> Result<&Path, StoreError> {
    let normal = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !normal || rel.as_os_str().is_empty() {
        return Err(StoreError::InvalidName(rel.display().to_string()));
    }
    Ok(rel)
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
