// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter error types

use thiserror::Error;

/// Errors from harness adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("unknown harness: {0}")]
    UnknownHarness(String),

    #[error(transparent)]
    Config(#[from] mdn_core::ConfigError),
}
