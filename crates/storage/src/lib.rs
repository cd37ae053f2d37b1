// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mdn-storage: File-authoritative state for Meridian
//!
//! Everything durable lives under `.meridian/`: append-only JSONL event logs
//! per space (`runs.jsonl`, `sessions.jsonl`), a `space.json` record per
//! space, and a content-addressed artifact tree. Writers serialize through
//! advisory file locks; readers never lock and instead rely on line-granular
//! append atomicity plus a crash-tolerant trailing-line rule.

pub mod artifacts;
pub mod error;
pub mod event_log;
pub mod id_gen;
pub mod lock;
pub mod paths;
pub mod run_log;
pub mod session_log;
pub mod space_file;
pub mod time;

pub use artifacts::{InMemoryStore, LocalStore};
pub use error::StorageError;
pub use event_log::{append_event, read_events};
pub use id_gen::{next_chat_id, next_run_id, next_space_id};
pub use lock::FileLock;
pub use paths::{
    ensure_gitignore, resolve_all_spaces_dir, resolve_run_log_dir, resolve_space_dir,
    resolve_state_paths, SpacePaths, StatePaths,
};
pub use run_log::{
    finalize_run, get_run, list_runs, run_stats, start_run, FinalizeOutcome, RunStats, StartRun,
};
pub use session_log::SessionStore;
pub use space_file::{create_space, get_space, list_spaces, update_space_status};
pub use time::utc_now_iso;
