// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed space metadata CRUD for `.spaces/<space-id>/space.json`

use crate::error::StorageError;
use crate::id_gen::next_space_id;
use crate::lock::FileLock;
use crate::paths::{ensure_gitignore, resolve_all_spaces_dir, resolve_space_dir, SpacePaths};
use crate::time::utc_now_iso;
use mdn_core::{SpaceId, SpaceRecord, SpaceStatus, SPACE_SCHEMA_VERSION};
use std::path::Path;

fn write_space_json(path: &Path, record: &SpaceRecord) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    // Tmp + rename keeps a concurrent reader from ever seeing a partial file.
    let mut serialized = serde_json::to_string(&serde_json::to_value(record)?)?;
    serialized.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, serialized).map_err(|e| StorageError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

fn read_space_json(path: &Path) -> Option<SpaceRecord> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Create one new active space and write `space.json`.
pub fn create_space(repo_root: &Path, name: Option<&str>) -> Result<SpaceRecord, StorageError> {
    let spaces_dir = resolve_all_spaces_dir(repo_root);
    std::fs::create_dir_all(&spaces_dir).map_err(|e| StorageError::io(&spaces_dir, e))?;

    let record = {
        let _lock = FileLock::acquire(&spaces_dir.join(".lock"))?;
        let space_id = next_space_id(repo_root)?;
        let paths = SpacePaths::from_space_dir(&resolve_space_dir(repo_root, &space_id));
        std::fs::create_dir_all(&paths.fs_dir).map_err(|e| StorageError::io(&paths.fs_dir, e))?;
        std::fs::create_dir_all(&paths.runs_dir)
            .map_err(|e| StorageError::io(&paths.runs_dir, e))?;

        let record = SpaceRecord {
            schema_version: SPACE_SCHEMA_VERSION,
            id: space_id,
            name: name.map(str::to_string),
            status: SpaceStatus::Active,
            created_at: utc_now_iso(),
            finished_at: None,
        };
        write_space_json(&paths.space_json, &record)?;
        record
    };

    ensure_gitignore(repo_root)?;
    tracing::info!(space_id = %record.id, "created space");
    Ok(record)
}

/// Load one `space.json` record. Invalid or missing files read as `None`.
pub fn get_space(repo_root: &Path, space_id: &SpaceId) -> Option<SpaceRecord> {
    let paths = SpacePaths::from_space_dir(&resolve_space_dir(repo_root, space_id));
    read_space_json(&paths.space_json)
}

/// Load all valid spaces from `.spaces/*/space.json`, ordered by ID.
pub fn list_spaces(repo_root: &Path) -> Result<Vec<SpaceRecord>, StorageError> {
    let spaces_dir = resolve_all_spaces_dir(repo_root);
    let entries = match std::fs::read_dir(&spaces_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(&spaces_dir, e)),
    };

    let mut records = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(&spaces_dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let paths = SpacePaths::from_space_dir(&entry.path());
        if let Some(record) = read_space_json(&paths.space_json) {
            records.push(record);
        }
    }
    records.sort_by(|a, b| a.id.sort_key().cmp(&b.id.sort_key()));
    Ok(records)
}

/// Update `space.json.status` with locked read-modify-write semantics.
///
/// Closing a space stamps `finished_at` if absent; reopening clears it.
pub fn update_space_status(
    repo_root: &Path,
    space_id: &SpaceId,
    new_status: SpaceStatus,
) -> Result<SpaceRecord, StorageError> {
    let paths = SpacePaths::from_space_dir(&resolve_space_dir(repo_root, space_id));
    let _lock = FileLock::acquire(&paths.space_lock)?;

    let current = read_space_json(&paths.space_json)
        .ok_or_else(|| StorageError::SpaceNotFound(space_id.as_str().to_string()))?;

    let finished_at = match new_status {
        SpaceStatus::Closed => current.finished_at.or_else(|| Some(utc_now_iso())),
        SpaceStatus::Active => None,
    };
    let updated = SpaceRecord {
        status: new_status,
        finished_at,
        ..current
    };
    write_space_json(&paths.space_json, &updated)?;
    Ok(updated)
}

#[cfg(test)]
#[path = "space_file_tests.rs"]
mod tests;
