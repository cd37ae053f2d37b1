// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mdn-engine: The Meridian run-execution engine
//!
//! Drives one run through spawn → stream → finalize: subprocess lifecycle in
//! its own process group, parent-signal forwarding, live budget enforcement,
//! timeouts, cancellation, classified retries, guardrails, secret redaction,
//! and a SIGTERM-masked finalize append so every started run is observable as
//! complete.

pub mod cleanup;
pub mod error;
pub mod exec;
pub mod extract;
pub mod safety;
pub mod subrun;

pub use cleanup::{cleanup_orphaned_locks, remove_space_lock, space_lock_path, write_space_lock};
pub use error::EngineError;
pub use exec::signal::{map_raw_exit, SignalForwarder, SigtermMask, TerminalSignal};
pub use exec::spawn::{spawn_and_stream, SpawnRequest, SpawnResult};
pub use exec::terminal::{resolve_visible_categories, TerminalEventFilter};
pub use exec::{execute_run, ExecuteContext, RunOutcome, RunRequest};
pub use extract::{enrich_finalize, reset_attempt_artifacts, FinalizeExtraction};
pub use safety::budget::LiveBudgetTracker;
pub use safety::classify::{classify_error, should_retry, ErrorCategory};
pub use safety::env::{sanitize_child_env, HARNESS_ENV_PASS_THROUGH};
pub use safety::guardrails::{normalize_guardrail_paths, run_guardrails, GuardrailFailure, GuardrailResult};
