// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run report extraction with `report.md` preference

use mdn_core::{make_artifact_key, ArtifactStore, RunId};
use serde_json::Value;

/// Where the extracted report text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    ReportMd,
    AssistantMessage,
}

/// Extracted report text, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedReport {
    pub content: Option<String>,
    pub source: Option<ReportSource>,
}

impl ExtractedReport {
    pub fn none() -> Self {
        Self {
            content: None,
            source: None,
        }
    }
}

fn read_artifact_text(artifacts: &dyn ArtifactStore, run_id: &RunId, name: &str) -> String {
    let key = make_artifact_key(run_id, name);
    if !artifacts.exists(&key) {
        return String::new();
    }
    match artifacts.get(&key) {
        Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
        Err(_) => String::new(),
    }
}

fn text_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(text_from_value)
                .filter(|part| !part.is_empty())
                .collect();
            parts.join("\n").trim().to_string()
        }
        Value::Object(map) => {
            let mut parts = Vec::new();
            for key in ["text", "message", "output"] {
                if let Some(nested) = map.get(key) {
                    let text = text_from_value(nested);
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
            }
            if let Some(content) = map.get("content") {
                let text = text_from_value(content);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            parts.join("\n").trim().to_string()
        }
        _ => String::new(),
    }
}

fn assistant_texts(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            let role = map
                .get("role")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_lowercase();
            let event_type = map
                .get("type")
                .or_else(|| map.get("event"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_lowercase();

            if role == "assistant" || event_type.contains("assistant") {
                if let Some(content) = map.get("content") {
                    let text = text_from_value(content);
                    if !text.is_empty() {
                        found.push(text);
                    }
                }
                for key in ["text", "message", "output"] {
                    if let Some(nested) = map.get(key) {
                        let text = text_from_value(nested);
                        if !text.is_empty() {
                            found.push(text);
                        }
                    }
                }
            }

            if let Some(Value::Array(choices)) = map.get("choices") {
                for choice in choices {
                    let Some(message) = choice.get("message") else {
                        continue;
                    };
                    let message_role = message
                        .get("role")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_lowercase();
                    if message_role == "assistant" {
                        if let Some(content) = message.get("content") {
                            let text = text_from_value(content);
                            if !text.is_empty() {
                                found.push(text);
                            }
                        }
                    }
                }
            }

            for nested in map.values() {
                assistant_texts(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                assistant_texts(item, found);
            }
        }
        _ => {}
    }
}

fn last_assistant_message(output_lines: &str) -> Option<String> {
    let mut last_assistant: Option<String> = None;
    let mut last_text_line: Option<String> = None;

    for line in output_lines.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        last_text_line = Some(stripped.to_string());
        let Ok(payload) = serde_json::from_str::<Value>(stripped) else {
            continue;
        };
        let mut found = Vec::new();
        assistant_texts(&payload, &mut found);
        if let Some(text) = found.last() {
            last_assistant = Some(text.trim().to_string());
        }
    }
    last_assistant.or(last_text_line)
}

/// Extract report text, preferring `report.md` over the assistant stream.
pub fn extract_or_fallback_report(
    artifacts: &dyn ArtifactStore,
    run_id: &RunId,
) -> ExtractedReport {
    let report_content = read_artifact_text(artifacts, run_id, "report.md");
    let report_content = report_content.trim();
    if !report_content.is_empty() {
        return ExtractedReport {
            content: Some(report_content.to_string()),
            source: Some(ReportSource::ReportMd),
        };
    }

    let output_lines = read_artifact_text(artifacts, run_id, "output.jsonl");
    let assistant = last_assistant_message(&output_lines)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());
    match assistant {
        Some(content) => ExtractedReport {
            content: Some(content),
            source: Some(ReportSource::AssistantMessage),
        },
        None => ExtractedReport::none(),
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
