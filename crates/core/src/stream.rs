// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured stream events parsed from harness output

use serde::{Deserialize, Serialize};

/// Closed set of stream-event categories surfaced to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    #[serde(rename = "lifecycle")]
    Lifecycle,
    #[serde(rename = "sub-run")]
    SubRun,
    #[serde(rename = "tool-use")]
    ToolUse,
    #[serde(rename = "thinking")]
    Thinking,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "progress")]
    Progress,
    #[serde(rename = "system")]
    System,
}

impl EventCategory {
    pub const ALL: [EventCategory; 8] = [
        EventCategory::Lifecycle,
        EventCategory::SubRun,
        EventCategory::ToolUse,
        EventCategory::Thinking,
        EventCategory::Assistant,
        EventCategory::Error,
        EventCategory::Progress,
        EventCategory::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Lifecycle => "lifecycle",
            EventCategory::SubRun => "sub-run",
            EventCategory::ToolUse => "tool-use",
            EventCategory::Thinking => "thinking",
            EventCategory::Assistant => "assistant",
            EventCategory::Error => "error",
            EventCategory::Progress => "progress",
            EventCategory::System => "system",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One categorized event parsed from a harness output line.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub event_type: String,
    pub category: EventCategory,
    pub raw_line: String,
    pub text: Option<String>,
    /// Full JSON payload for structured lines, `Null` for synthetic ones.
    pub metadata: serde_json::Value,
}

impl StreamEvent {
    /// Synthetic event for a non-JSON output line.
    pub fn line(raw_line: &str) -> Self {
        Self {
            event_type: "line".to_string(),
            category: EventCategory::System,
            raw_line: raw_line.to_string(),
            text: Some(raw_line.trim().to_string()),
            metadata: serde_json::Value::Null,
        }
    }

    /// Integer metadata field lookup, tolerant of string-encoded numbers.
    pub fn metadata_int(&self, key: &str) -> Option<i64> {
        let value = self.metadata.get(key)?;
        if let Some(n) = value.as_i64() {
            return Some(n);
        }
        if let Some(f) = value.as_f64() {
            return Some(f as i64);
        }
        value.as_str()?.trim().parse().ok()
    }
}
