// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem path helpers for Meridian state
//!
//! The repo root is the caller's working root; state lives under
//! `<repo>/.meridian/` unless `MERIDIAN_STATE_ROOT` overrides it (absolute,
//! `~`-expanded, or repo-relative).

use crate::error::StorageError;
use mdn_core::{RunId, SpaceId};
use std::path::{Path, PathBuf};

const MERIDIAN_DIR: &str = ".meridian";
const SPACES_DIR: &str = ".spaces";
const GITIGNORE_CONTENT: &str = ".spaces/**\n!.spaces/*/\n!.spaces/*/fs/\n!.spaces/*/fs/**\n";

/// Resolved paths for one space directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpacePaths {
    pub space_dir: PathBuf,
    pub space_json: PathBuf,
    pub space_lock: PathBuf,
    pub runs_jsonl: PathBuf,
    pub runs_lock: PathBuf,
    pub sessions_jsonl: PathBuf,
    pub sessions_lock: PathBuf,
    pub sessions_dir: PathBuf,
    pub fs_dir: PathBuf,
    pub runs_dir: PathBuf,
}

impl SpacePaths {
    /// Build space-relative paths from an absolute space directory.
    pub fn from_space_dir(space_dir: &Path) -> Self {
        Self {
            space_dir: space_dir.to_path_buf(),
            space_json: space_dir.join("space.json"),
            space_lock: space_dir.join("space.lock"),
            runs_jsonl: space_dir.join("runs.jsonl"),
            runs_lock: space_dir.join("runs.lock"),
            sessions_jsonl: space_dir.join("sessions.jsonl"),
            sessions_lock: space_dir.join("sessions.lock"),
            sessions_dir: space_dir.join("sessions"),
            fs_dir: space_dir.join("fs"),
            runs_dir: space_dir.join("runs"),
        }
    }

    /// Lifetime lock path for one active session.
    pub fn session_lock(&self, chat_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{chat_id}.lock"))
    }
}

/// Resolved on-disk Meridian state paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub root_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub all_spaces_dir: PathBuf,
    pub active_spaces_dir: PathBuf,
    pub config_path: PathBuf,
}

fn resolve_state_root(repo_root: &Path) -> PathBuf {
    let override_value = std::env::var("MERIDIAN_STATE_ROOT").unwrap_or_default();
    let trimmed = override_value.trim();
    if trimmed.is_empty() {
        return repo_root.join(MERIDIAN_DIR);
    }

    let expanded = if let Some(rest) = trimmed.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(trimmed),
        }
    } else {
        PathBuf::from(trimmed)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        repo_root.join(expanded)
    }
}

/// Resolve all state paths rooted under `.meridian/`.
pub fn resolve_state_paths(repo_root: &Path) -> StatePaths {
    let root_dir = resolve_state_root(repo_root);
    StatePaths {
        artifacts_dir: root_dir.join("artifacts"),
        runs_dir: root_dir.join("runs"),
        all_spaces_dir: root_dir.join(SPACES_DIR),
        active_spaces_dir: root_dir.join("active-spaces"),
        config_path: root_dir.join("config.toml"),
        root_dir,
    }
}

/// Return `.meridian/.spaces/` for a repository root.
pub fn resolve_all_spaces_dir(repo_root: &Path) -> PathBuf {
    resolve_state_paths(repo_root).all_spaces_dir
}

/// Return `.meridian/.spaces/<space-id>/` for a repository root.
pub fn resolve_space_dir(repo_root: &Path, space_id: &SpaceId) -> PathBuf {
    resolve_all_spaces_dir(repo_root).join(space_id.as_str())
}

/// Run artifact directory for run/space IDs. Space-less runs land under the
/// state root's `runs/`.
pub fn resolve_run_log_dir(repo_root: &Path, run_id: &RunId, space_id: Option<&SpaceId>) -> PathBuf {
    let root = resolve_state_paths(repo_root).root_dir;
    match space_id {
        Some(space_id) => root
            .join(SPACES_DIR)
            .join(space_id.as_str())
            .join("runs")
            .join(run_id.as_str()),
        None => root.join("runs").join(run_id.as_str()),
    }
}

/// Create `.meridian/.gitignore` with file-authority ignore rules.
///
/// Idempotent; rewrites atomically when the managed content drifts.
pub fn ensure_gitignore(repo_root: &Path) -> Result<PathBuf, StorageError> {
    let meridian_dir = repo_root.join(MERIDIAN_DIR);
    std::fs::create_dir_all(&meridian_dir).map_err(|e| StorageError::io(&meridian_dir, e))?;
    let gitignore_path = meridian_dir.join(".gitignore");

    if let Ok(current) = std::fs::read_to_string(&gitignore_path) {
        if current == GITIGNORE_CONTENT {
            return Ok(gitignore_path);
        }
    }

    let tmp_path = meridian_dir.join(".gitignore.tmp");
    std::fs::write(&tmp_path, GITIGNORE_CONTENT).map_err(|e| StorageError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &gitignore_path)
        .map_err(|e| StorageError::io(&gitignore_path, e))?;
    Ok(gitignore_path)
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
