// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active-space leases and orphaned-lock recovery
//!
//! A process attaching to a space writes `active-spaces/<space-id>.lock` with
//! its pids and deletes it on clean exit. Crash recovery runs on every entry:
//! any lease whose child pid is gone is removed and a still-active orphaned
//! space is closed.

use crate::error::EngineError;
use mdn_core::{SpaceId, SpaceStatus};
use mdn_storage::{resolve_state_paths, utc_now_iso};
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// JSON payload of one `active-spaces/<space-id>.lock` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceLease {
    pub space_id: SpaceId,
    pub parent_pid: u32,
    pub child_pid: Option<u32>,
    pub started_at: String,
    pub command: Vec<String>,
}

/// Lease path for one space ID.
pub fn space_lock_path(repo_root: &Path, space_id: &SpaceId) -> PathBuf {
    resolve_state_paths(repo_root)
        .active_spaces_dir
        .join(format!("{}.lock", space_id.as_str()))
}

/// Write (or refresh) the attachment lease for one space.
pub fn write_space_lock(
    repo_root: &Path,
    space_id: &SpaceId,
    command: &[String],
    child_pid: Option<u32>,
) -> Result<PathBuf, EngineError> {
    let path = space_lock_path(repo_root, space_id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    let lease = SpaceLease {
        space_id: space_id.clone(),
        parent_pid: std::process::id(),
        child_pid,
        started_at: utc_now_iso(),
        command: command.to_vec(),
    };
    let payload = serde_json::to_value(&lease)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .map_err(mdn_storage::StorageError::from)?;
    std::fs::write(&path, format!("{payload}\n")).map_err(|e| EngineError::io(&path, e))?;
    Ok(path)
}

/// Remove the attachment lease on clean exit.
pub fn remove_space_lock(repo_root: &Path, space_id: &SpaceId) {
    let path = space_lock_path(repo_root, space_id);
    let _ = std::fs::remove_file(path);
}

fn pid_exists(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // Signal 0 probes liveness. EPERM means the process exists but is owned
    // by someone else; ESRCH means it is gone.
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Remove stale space leases and close orphaned active spaces.
///
/// Called on every entry; heals the case where a parent was SIGKILLed before
/// it could clean up.
pub fn cleanup_orphaned_locks(repo_root: &Path) -> Result<Vec<SpaceId>, EngineError> {
    let lock_dir = resolve_state_paths(repo_root).active_spaces_dir;
    let entries = match std::fs::read_dir(&lock_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EngineError::io(&lock_dir, e)),
    };

    let mut orphaned: Vec<SpaceId> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(&lock_dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("lock") {
            continue;
        }

        // The filename is the fallback identity when the payload is corrupt.
        let mut space_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(SpaceId::from_string)
            .unwrap_or_else(|| SpaceId::from_string(""));
        let mut child_pid = 0u32;

        if let Ok(raw) = std::fs::read_to_string(&path) {
            if let Ok(lease) = serde_json::from_str::<SpaceLease>(&raw) {
                if !lease.space_id.as_str().trim().is_empty() {
                    space_id = lease.space_id;
                }
                child_pid = lease.child_pid.unwrap_or(0);
            }
        }

        if child_pid > 0 && pid_exists(child_pid) {
            continue;
        }

        let _ = std::fs::remove_file(&path);
        if !space_id.as_str().is_empty() {
            orphaned.push(space_id);
        }
    }

    orphaned.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    orphaned.dedup();

    for space_id in &orphaned {
        let Some(current) = mdn_storage::get_space(repo_root, space_id) else {
            continue;
        };
        if current.status != SpaceStatus::Active {
            continue;
        }
        if let Err(err) = mdn_storage::update_space_status(repo_root, space_id, SpaceStatus::Closed)
        {
            tracing::debug!(space_id = %space_id, error = %err, "failed to close orphaned space");
        } else {
            tracing::info!(space_id = %space_id, "closed orphaned space");
        }
    }
    Ok(orphaned)
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
