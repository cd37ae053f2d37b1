// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session event rows for `sessions.jsonl`

use crate::id::{ChatId, HarnessId, ModelId};
use serde::{Deserialize, Serialize};

fn schema_v1() -> u32 {
    1
}

/// One line of `sessions.jsonl`: a `start` row when a harness conversation
/// attaches, a `stop` row when it detaches (or is reaped as stale).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SessionEvent {
    #[serde(rename = "start")]
    Start {
        #[serde(default = "schema_v1")]
        v: u32,
        chat_id: ChatId,
        harness: HarnessId,
        harness_session_id: String,
        model: ModelId,
        params: Vec<String>,
        started_at: String,
    },
    #[serde(rename = "stop")]
    Stop {
        #[serde(default = "schema_v1")]
        v: u32,
        chat_id: ChatId,
        stopped_at: String,
    },
}

impl SessionEvent {
    pub fn chat_id(&self) -> &ChatId {
        match self {
            SessionEvent::Start { chat_id, .. } => chat_id,
            SessionEvent::Stop { chat_id, .. } => chat_id,
        }
    }
}

/// Derived session state from the start/stop fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub chat_id: ChatId,
    pub harness: HarnessId,
    pub harness_session_id: String,
    pub model: ModelId,
    pub params: Vec<String>,
    pub started_at: String,
    pub stopped_at: Option<String>,
}
