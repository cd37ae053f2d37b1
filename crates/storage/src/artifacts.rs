// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact store implementations
//!
//! Artifacts are addressed as `<run-id>/<name>` relative paths. Both stores
//! reject keys with absolute or `..` components.

use mdn_core::{ArtifactError, ArtifactKey, ArtifactStore, RunId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

fn safe_relative(key: &ArtifactKey) -> Result<PathBuf, ArtifactError> {
    let rel = Path::new(key.as_str());
    // Anything but plain path segments (root, `..`, `.`, prefixes) is unsafe.
    let all_normal = rel
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !all_normal || rel.as_os_str().is_empty() {
        return Err(ArtifactError::UnsafeKey(key.as_str().to_string()));
    }
    Ok(rel.to_path_buf())
}

/// Filesystem-backed artifact store rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }
}

impl ArtifactStore for LocalStore {
    fn put(&self, key: &ArtifactKey, data: &[u8]) -> Result<(), ArtifactError> {
        let target = self.root_dir.join(safe_relative(key)?);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::Io {
                key: key.as_str().to_string(),
                source: e,
            })?;
        }
        std::fs::write(&target, data).map_err(|e| ArtifactError::Io {
            key: key.as_str().to_string(),
            source: e,
        })
    }

    fn get(&self, key: &ArtifactKey) -> Result<Vec<u8>, ArtifactError> {
        let target = self.root_dir.join(safe_relative(key)?);
        match std::fs::read(&target) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(key.as_str().to_string()))
            }
            Err(e) => Err(ArtifactError::Io {
                key: key.as_str().to_string(),
                source: e,
            }),
        }
    }

    fn exists(&self, key: &ArtifactKey) -> bool {
        match safe_relative(key) {
            Ok(rel) => self.root_dir.join(rel).exists(),
            Err(_) => false,
        }
    }

    fn delete(&self, key: &ArtifactKey) -> Result<(), ArtifactError> {
        let target = self.root_dir.join(safe_relative(key)?);
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ArtifactError::Io {
                key: key.as_str().to_string(),
                source: e,
            }),
        }
    }

    fn list(&self, run_id: &RunId) -> Vec<ArtifactKey> {
        let base = self.root_dir.join(run_id.as_str());
        let mut keys = Vec::new();
        collect_files(&base, &mut keys);
        let mut keys: Vec<ArtifactKey> = keys
            .into_iter()
            .filter_map(|path| {
                path.strip_prefix(&self.root_dir)
                    .ok()
                    .and_then(|rel| rel.to_str())
                    .map(ArtifactKey::new)
            })
            .collect();
        keys.sort();
        keys
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}

/// Process-local in-memory artifact store for tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for InMemoryStore {
    fn put(&self, key: &ArtifactKey, data: &[u8]) -> Result<(), ArtifactError> {
        safe_relative(key)?;
        self.data
            .lock()
            .insert(key.as_str().to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &ArtifactKey) -> Result<Vec<u8>, ArtifactError> {
        safe_relative(key)?;
        self.data
            .lock()
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound(key.as_str().to_string()))
    }

    fn exists(&self, key: &ArtifactKey) -> bool {
        self.data.lock().contains_key(key.as_str())
    }

    fn delete(&self, key: &ArtifactKey) -> Result<(), ArtifactError> {
        safe_relative(key)?;
        self.data.lock().remove(key.as_str());
        Ok(())
    }

    fn list(&self, run_id: &RunId) -> Vec<ArtifactKey> {
        let prefix = format!("{}/", run_id.as_str());
        self.data
            .lock()
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .map(ArtifactKey::new)
            .collect()
    }
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
