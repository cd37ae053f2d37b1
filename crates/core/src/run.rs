// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run event rows and the derived run record
//!
//! A run is persisted as append-only events in `runs.jsonl`: exactly one
//! `start` row, then at most one `finalize` row overlaying the outcome.
//! Absence of a finalize means "running or crashed".

use crate::id::{ChatId, HarnessId, ModelId, RunId};
use serde::{Deserialize, Serialize};

/// Run lifecycle status as persisted in event rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        RunStatus::Running
    }
}

fn schema_v1() -> u32 {
    1
}

/// One line of `runs.jsonl`.
///
/// Serializes as `{"event": "start", ...}` / `{"event": "finalize", ...}`
/// with a `v: 1` schema marker. Optional fields are omitted when absent,
/// except `agent` which is always present (null when the run had none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RunEvent {
    #[serde(rename = "start")]
    Start {
        #[serde(default = "schema_v1")]
        v: u32,
        id: RunId,
        chat_id: ChatId,
        model: ModelId,
        agent: Option<String>,
        harness: HarnessId,
        status: RunStatus,
        started_at: String,
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        harness_session_id: Option<String>,
    },
    #[serde(rename = "finalize")]
    Finalize {
        #[serde(default = "schema_v1")]
        v: u32,
        id: RunId,
        status: RunStatus,
        exit_code: i32,
        finished_at: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_tokens: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_tokens: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            RunEvent::Start { id, .. } => id,
            RunEvent::Finalize { id, .. } => id,
        }
    }
}

/// Derived run state: the fold of all events matching one run ID.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: RunId,
    pub chat_id: Option<ChatId>,
    pub model: Option<ModelId>,
    pub agent: Option<String>,
    pub harness: Option<HarnessId>,
    pub harness_session_id: Option<String>,
    pub status: RunStatus,
    pub prompt: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub exit_code: Option<i32>,
    pub duration_secs: Option<f64>,
    pub total_cost_usd: Option<f64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn empty(id: RunId) -> Self {
        Self {
            id,
            chat_id: None,
            model: None,
            agent: None,
            harness: None,
            harness_session_id: None,
            status: RunStatus::Running,
            prompt: None,
            started_at: None,
            finished_at: None,
            exit_code: None,
            duration_secs: None,
            total_cost_usd: None,
            input_tokens: None,
            output_tokens: None,
            error: None,
        }
    }

    /// Overlay one event onto the record.
    pub fn apply(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Start {
                chat_id,
                model,
                agent,
                harness,
                status,
                started_at,
                prompt,
                harness_session_id,
                ..
            } => {
                self.chat_id = Some(chat_id.clone());
                self.model = Some(model.clone());
                self.agent = agent.clone();
                self.harness = Some(harness.clone());
                self.status = *status;
                self.started_at = Some(started_at.clone());
                self.prompt = Some(prompt.clone());
                if harness_session_id.is_some() {
                    self.harness_session_id = harness_session_id.clone();
                }
            }
            RunEvent::Finalize {
                status,
                exit_code,
                finished_at,
                duration_secs,
                total_cost_usd,
                input_tokens,
                output_tokens,
                error,
                ..
            } => {
                self.status = *status;
                self.exit_code = Some(*exit_code);
                self.finished_at = Some(finished_at.clone());
                if duration_secs.is_some() {
                    self.duration_secs = *duration_secs;
                }
                if total_cost_usd.is_some() {
                    self.total_cost_usd = *total_cost_usd;
                }
                if input_tokens.is_some() {
                    self.input_tokens = *input_tokens;
                }
                if output_tokens.is_some() {
                    self.output_tokens = *output_tokens;
                }
                if error.is_some() {
                    self.error = error.clone();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
