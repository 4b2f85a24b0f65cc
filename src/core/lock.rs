//! core::lock
//!
//! Exclusive workspace lock for publish runs.
//!
//! # Architecture
//!
//! A publish run edits manifests, creates commits, and rewrites the
//! configuration stores. Two runs doing that concurrently in one workspace
//! would corrupt each other, so every run takes an OS-level exclusive lock
//! first and the second invocation fails fast with a message naming the
//! lock file.
//!
//! # Storage
//!
//! - `<root>/.convoy.lock` - lock file, exclusively locked while a run is live
//!
//! # Invariants
//!
//! - The lock spans the whole publish run
//! - Dropping the guard releases the lock, panics included
//! - Acquisition never blocks

use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::WorkspacePaths;

/// Errors from taking the workspace lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another convoy process holds the lock.
    #[error("workspace is locked by another convoy process (lock file: {})", .0.display())]
    AlreadyLocked(PathBuf),

    /// The lock file could not be opened or locked.
    #[error("cannot lock {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// RAII guard for the exclusive workspace lock.
///
/// The OS lock is tied to the open file handle, so dropping the guard
/// releases it even when the publish run panics.
#[derive(Debug)]
pub struct WorkspaceLock {
    handle: File,
}

impl WorkspaceLock {
    /// Take the exclusive lock for `paths`, failing fast when it is held.
    ///
    /// The lock file is created on first use and left in place afterwards;
    /// only the OS lock on it matters.
    pub fn acquire(paths: &WorkspacePaths) -> Result<Self, LockError> {
        let path = paths.lock_path();
        let handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;

        match handle.try_lock_exclusive() {
            Ok(()) => Ok(Self { handle }),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked(path)),
            Err(source) => Err(LockError::Io { path, source }),
        }
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = self.handle.unlock();
    }
}
