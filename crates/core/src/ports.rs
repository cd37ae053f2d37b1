// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol interfaces between the engine and its collaborators

use crate::id::RunId;
use crate::stream::StreamEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Artifact address: a relative path of the form `<run-id>/<name>`.
///
/// Keys with absolute or `..` components are rejected by every store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Build an artifact key from run ID and artifact name.
pub fn make_artifact_key(run_id: &RunId, name: &str) -> ArtifactKey {
    ArtifactKey::new(format!("{}/{}", run_id.as_str(), name))
}

/// Errors from artifact store operations.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact key must be a safe relative path: {0}")]
    UnsafeKey(String),
    #[error("artifact not found: {0}")]
    NotFound(String),
    #[error("artifact io error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read/write interface for run artifacts.
pub trait ArtifactStore: Send + Sync {
    fn put(&self, key: &ArtifactKey, data: &[u8]) -> Result<(), ArtifactError>;

    fn get(&self, key: &ArtifactKey) -> Result<Vec<u8>, ArtifactError>;

    fn exists(&self, key: &ArtifactKey) -> bool;

    fn delete(&self, key: &ArtifactKey) -> Result<(), ArtifactError>;

    fn list(&self, run_id: &RunId) -> Vec<ArtifactKey>;
}

/// Observer for categorized stream events during a run.
pub trait StreamObserver: Send + Sync {
    fn observe(&self, event: &StreamEvent);
}
