// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory exclusive file locks
//!
//! All writers to a log take the log's lockfile exclusively for the duration
//! of the read-check-write sequence. The OS releases the lock when the
//! holding process exits, so a crashed writer never wedges a log.

use crate::error::StorageError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// RAII guard over an exclusive advisory lock on a lockfile.
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

fn open_lockfile(path: &Path) -> Result<File, StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    // Never truncate: the file may carry a payload owned by the lock holder.
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| StorageError::io(path, e))
}

impl FileLock {
    /// Block until the exclusive lock is held.
    pub fn acquire(path: &Path) -> Result<Self, StorageError> {
        let file = open_lockfile(path)?;
        file.lock_exclusive().map_err(|e| StorageError::Lock {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self { file })
    }

    /// Non-blocking acquire; `None` when another holder has the lock.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, StorageError> {
        let file = open_lockfile(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(StorageError::Lock {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
