// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed run event store for `.spaces/<space-id>/runs.jsonl`

use crate::error::StorageError;
use crate::event_log::{append_line, read_events};
use crate::id_gen::next_run_id;
use crate::lock::FileLock;
use crate::paths::SpacePaths;
use crate::time::utc_now_iso;
use mdn_core::{ChatId, HarnessId, ModelId, RunEvent, RunId, RunRecord, RunStatus};
use std::collections::HashMap;
use std::path::Path;

/// Inputs for a run `start` event.
#[derive(Debug, Clone)]
pub struct StartRun {
    /// Pre-allocated run ID; `None` allocates the next `r<N>` under the lock.
    pub run_id: Option<RunId>,
    pub chat_id: ChatId,
    pub model: ModelId,
    pub agent: Option<String>,
    pub harness: HarnessId,
    pub prompt: String,
    pub harness_session_id: Option<String>,
    /// Override for tests; defaults to now-UTC.
    pub started_at: Option<String>,
}

/// Outcome fields for a run `finalize` event.
#[derive(Debug, Clone, Default)]
pub struct FinalizeOutcome {
    pub status: RunStatus,
    pub exit_code: i32,
    pub duration_secs: Option<f64>,
    pub total_cost_usd: Option<f64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub error: Option<String>,
    pub finished_at: Option<String>,
}

/// Append a run start event under `runs.lock` and return the run ID.
pub fn start_run(space_dir: &Path, params: StartRun) -> Result<RunId, StorageError> {
    let paths = SpacePaths::from_space_dir(space_dir);
    let started_at = params.started_at.unwrap_or_else(utc_now_iso);

    let _lock = FileLock::acquire(&paths.runs_lock)?;
    let run_id = match params.run_id {
        Some(id) => id,
        None => next_run_id(space_dir)?,
    };
    let event = RunEvent::Start {
        v: 1,
        id: run_id.clone(),
        chat_id: params.chat_id,
        model: params.model,
        agent: params.agent,
        harness: params.harness,
        status: RunStatus::Running,
        started_at,
        prompt: params.prompt,
        harness_session_id: params.harness_session_id,
    };
    append_line(&paths.runs_jsonl, &serde_json::to_value(&event)?)?;
    Ok(run_id)
}

/// Append a run finalize event under `runs.lock`.
pub fn finalize_run(
    space_dir: &Path,
    run_id: &RunId,
    outcome: FinalizeOutcome,
) -> Result<(), StorageError> {
    let paths = SpacePaths::from_space_dir(space_dir);
    let event = RunEvent::Finalize {
        v: 1,
        id: run_id.clone(),
        status: outcome.status,
        exit_code: outcome.exit_code,
        finished_at: outcome.finished_at.unwrap_or_else(utc_now_iso),
        duration_secs: outcome.duration_secs,
        total_cost_usd: outcome.total_cost_usd,
        input_tokens: outcome.input_tokens,
        output_tokens: outcome.output_tokens,
        error: outcome.error,
    };
    let payload = serde_json::to_value(&event)?;

    let _lock = FileLock::acquire(&paths.runs_lock)?;
    append_line(&paths.runs_jsonl, &payload)
}

fn fold_events(space_dir: &Path) -> Result<Vec<RunRecord>, StorageError> {
    let paths = SpacePaths::from_space_dir(space_dir);
    let mut records: HashMap<String, RunRecord> = HashMap::new();

    for value in read_events(&paths.runs_jsonl)? {
        let Ok(event) = serde_json::from_value::<RunEvent>(value) else {
            continue;
        };
        let id = event.run_id().clone();
        records
            .entry(id.as_str().to_string())
            .or_insert_with(|| RunRecord::empty(id))
            .apply(&event);
    }

    let mut runs: Vec<RunRecord> = records.into_values().collect();
    runs.sort_by(|a, b| a.id.sort_key().cmp(&b.id.sort_key()));
    Ok(runs)
}

/// List derived run records in numeric `r<N>` order.
pub fn list_runs(space_dir: &Path) -> Result<Vec<RunRecord>, StorageError> {
    fold_events(space_dir)
}

/// Return one run by ID.
pub fn get_run(space_dir: &Path, run_id: &RunId) -> Result<Option<RunRecord>, StorageError> {
    Ok(fold_events(space_dir)?
        .into_iter()
        .find(|run| &run.id == run_id))
}

/// Aggregate run stats derived from the event log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub total_runs: usize,
    pub by_status: HashMap<String, usize>,
    pub by_model: HashMap<String, usize>,
    pub total_duration_secs: f64,
    pub total_cost_usd: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

/// Aggregate high-level run stats for one space.
pub fn run_stats(space_dir: &Path) -> Result<RunStats, StorageError> {
    let mut stats = RunStats::default();
    for run in fold_events(space_dir)? {
        stats.total_runs += 1;
        *stats
            .by_status
            .entry(run.status.as_str().to_string())
            .or_default() += 1;
        if let Some(model) = &run.model {
            *stats.by_model.entry(model.as_str().to_string()).or_default() += 1;
        }
        if let Some(duration) = run.duration_secs {
            stats.total_duration_secs += duration;
        }
        if let Some(cost) = run.total_cost_usd {
            stats.total_cost_usd += cost;
        }
        if let Some(tokens) = run.input_tokens {
            stats.total_input_tokens += tokens;
        }
        if let Some(tokens) = run.output_tokens {
            stats.total_output_tokens += tokens;
        }
    }
    Ok(stats)
}

#[cfg(test)]
#[path = "run_log_tests.rs"]
mod tests;
