// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic ID allocation
//!
//! Next values are derived from the maximum observed ID: runs and chats from
//! their space's event logs, spaces from the `.spaces/*` directory names.
//! Every allocator must be called under the relevant lock (`runs.lock`,
//! `sessions.lock`, or `.spaces/.lock`) so read-then-allocate is atomic.

use crate::error::StorageError;
use crate::event_log::read_events;
use crate::paths::{resolve_all_spaces_dir, SpacePaths};
use mdn_core::{ChatId, RunId, SpaceId};
use std::path::Path;

fn numeric_suffix(value: &str, prefix: &str) -> Option<u64> {
    let suffix = value.strip_prefix(prefix)?;
    if suffix.is_empty() {
        return None;
    }
    suffix.parse().ok()
}

fn max_observed(log_path: &Path, field: &str, prefix: &str) -> Result<u64, StorageError> {
    let mut max = 0;
    for event in read_events(log_path)? {
        let Some(raw) = event.get(field).and_then(|v| v.as_str()) else {
            continue;
        };
        if let Some(n) = numeric_suffix(raw, prefix) {
            max = max.max(n);
        }
    }
    Ok(max)
}

/// Next `r<N>` for a space. Caller must hold `runs.lock`.
pub fn next_run_id(space_dir: &Path) -> Result<RunId, StorageError> {
    let paths = SpacePaths::from_space_dir(space_dir);
    let max = max_observed(&paths.runs_jsonl, "id", RunId::PREFIX)?;
    Ok(RunId::from_number(max + 1))
}

/// Next `c<N>` for a space. Caller must hold `sessions.lock`.
pub fn next_chat_id(space_dir: &Path) -> Result<ChatId, StorageError> {
    let paths = SpacePaths::from_space_dir(space_dir);
    let max = max_observed(&paths.sessions_jsonl, "chat_id", ChatId::PREFIX)?;
    Ok(ChatId::from_number(max + 1))
}

/// Next `s<N>` for a repository. Caller must hold `.spaces/.lock`.
pub fn next_space_id(repo_root: &Path) -> Result<SpaceId, StorageError> {
    let spaces_dir = resolve_all_spaces_dir(repo_root);
    let mut max = 0;
    let entries = match std::fs::read_dir(&spaces_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SpaceId::from_number(1));
        }
        Err(e) => return Err(StorageError::io(&spaces_dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(&spaces_dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(n) = name.to_str().and_then(|s| numeric_suffix(s, SpaceId::PREFIX)) {
            max = max.max(n);
        }
    }
    Ok(SpaceId::from_number(max + 1))
}

#[cfg(test)]
#[path = "id_gen_tests.rs"]
mod tests;
