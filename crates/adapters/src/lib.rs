// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mdn-adapters: Per-harness shims for Meridian
//!
//! Each adapter knows how to build the harness command line, parse its
//! stream-event output, and extract usage/session info from captured
//! artifacts. Command construction is strategy-driven so adapters stay small.

pub mod adapter;
pub mod claude;
pub mod codex;
pub mod common;
pub mod error;
pub mod opencode;
pub mod permissions;
pub mod registry;
pub mod strategies;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use adapter::{
    HarnessAdapter, HarnessCapabilities, PermissionResolver, RunParams, SafeDefaultResolver,
};
pub use claude::ClaudeAdapter;
pub use codex::CodexAdapter;
pub use error::AdapterError;
pub use opencode::OpenCodeAdapter;
pub use permissions::{
    opencode_permission_json, permission_flags_for_harness, validate_permission_config_for_harness,
    TieredPermissionResolver,
};
pub use registry::HarnessRegistry;

#[cfg(any(test, feature = "test-support"))]
pub use test_support::ScriptedAdapter;
