// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sub-run protocol: depth tracking and compact lifecycle events
//!
//! When a run executes inside another run (`MERIDIAN_DEPTH > 0`), the engine
//! emits single-line JSON markers on stdout so the parent's stream-event
//! categorizer can surface the nested run. This is the only cross-process
//! IPC; the schema stays one-line so the parent's parser is trivial and
//! crash-tolerant.

use mdn_core::{ConfigError, RunId};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

fn read_non_negative_int(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = std::env::var(name).unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed.parse().map_err(|_| ConfigError::InvalidDepthVar {
        name,
        value: trimmed.to_string(),
    })
}

/// Current nesting depth (`MERIDIAN_DEPTH`, default 0).
pub fn current_depth() -> Result<u32, ConfigError> {
    read_non_negative_int("MERIDIAN_DEPTH", 0)
}

/// Configured depth bound (`MERIDIAN_MAX_DEPTH`), if any.
pub fn max_depth() -> Result<Option<u32>, ConfigError> {
    let raw = std::env::var("MERIDIAN_MAX_DEPTH").unwrap_or_default();
    if raw.trim().is_empty() {
        return Ok(None);
    }
    read_non_negative_int("MERIDIAN_MAX_DEPTH", 0).map(Some)
}

/// Parent run correlation ID (`MERIDIAN_PARENT_RUN_ID`), if any.
pub fn parent_run_id() -> Option<String> {
    std::env::var("MERIDIAN_PARENT_RUN_ID")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn emit(payload: serde_json::Value) {
    // Plain stdout write; the parent's stdout pump parses it.
    println!("{payload}");
}

/// Emit the `meridian.run.start` marker when running as a sub-run.
pub fn emit_run_start(run_id: &RunId, model: &str, agent: Option<&str>, depth: u32) {
    if depth == 0 {
        return;
    }
    let mut payload = json!({
        "v": 1,
        "t": "meridian.run.start",
        "id": run_id.as_str(),
        "model": model,
        "parent": parent_run_id(),
        "d": depth,
        "ts": unix_now_secs(),
    });
    if let Some(agent) = agent {
        payload["agent"] = json!(agent);
    }
    emit(payload);
}

/// Emit the `meridian.run.done` marker when running as a sub-run.
pub fn emit_run_done(run_id: &RunId, exit_code: i32, secs: f64, tokens: Option<u64>, depth: u32) {
    if depth == 0 {
        return;
    }
    emit(json!({
        "v": 1,
        "t": "meridian.run.done",
        "id": run_id.as_str(),
        "exit": exit_code,
        "secs": secs,
        "tok": tokens,
        "parent": parent_run_id(),
        "d": depth,
        "ts": unix_now_secs(),
    }));
}

#[cfg(test)]
#[path = "subrun_tests.rs"]
mod tests;
