// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the run-execution engine.
///
/// Configuration problems bubble to the caller before any child is spawned;
/// everything after the start event is appended is captured and folded into
/// the run's finalize record instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] mdn_core::ConfigError),

    #[error(transparent)]
    Adapter(#[from] mdn_adapters::AdapterError),

    #[error(transparent)]
    Storage(#[from] mdn_storage::StorageError),

    #[error(transparent)]
    Artifact(#[from] mdn_core::ArtifactError),

    #[error("guardrail script not found: {0}")]
    GuardrailNotFound(PathBuf),

    #[error("cannot spawn process: command is empty")]
    EmptyCommand,

    #[error("failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
