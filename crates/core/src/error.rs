// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration validation errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised synchronously before any process is spawned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported permission tier '{0}' (expected: read-only, workspace-write, full-access, danger)")]
    UnsupportedTier(String),

    #[error("permission tier 'danger' requires explicit unsafe confirmation")]
    DangerRequiresUnsafe,

    #[error("{0} must be > 0 when provided")]
    InvalidBudget(&'static str),

    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidDepthVar { name: &'static str, value: String },

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },
}
