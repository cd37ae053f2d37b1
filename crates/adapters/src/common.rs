// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers across harness adapters

use mdn_core::{
    make_artifact_key, ArtifactStore, EventCategory, RunId, StreamEvent, TokenUsage,
};
use serde_json::Value;

/// Token key spellings checked by usage extraction, as (input, output) pairs.
pub const TOKEN_KEY_PAIRS: [(&str, &str); 5] = [
    ("input_tokens", "output_tokens"),
    ("input", "output"),
    ("prompt_tokens", "completion_tokens"),
    ("prompt_token_count", "completion_token_count"),
    ("inputTokenCount", "outputTokenCount"),
];

/// Cost key spellings recognized in usage payloads and live budget lines.
pub const COST_KEYS: [&str; 5] = [
    "total_cost_usd",
    "cost_usd",
    "cost",
    "total_cost",
    "totalCostUsd",
];

/// Parse one output line and categorize it through an adapter's exact map.
///
/// Non-JSON lines become synthetic `line` events. The sub-run protocol
/// markers always categorize as `sub-run` regardless of the adapter map;
/// unknown types fall to `default_category`.
pub fn parse_stream_event(
    line: &str,
    exact_map: &[(&str, EventCategory)],
    default_category: EventCategory,
) -> Option<StreamEvent> {
    let stripped = line.trim();
    if stripped.is_empty() {
        return None;
    }

    let payload: Value = match serde_json::from_str(stripped) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) | Err(_) => return Some(StreamEvent::line(line)),
    };

    let event_type = payload
        .get("type")
        .or_else(|| payload.get("event"))
        .or_else(|| payload.get("t"))
        .and_then(|v| v.as_str())
        .unwrap_or("line")
        .to_string();
    let text = payload
        .get("text")
        .or_else(|| payload.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let category = if event_type.starts_with("meridian.run.") {
        EventCategory::SubRun
    } else {
        exact_map
            .iter()
            .find(|(name, _)| *name == event_type)
            .map(|(_, category)| *category)
            .unwrap_or(default_category)
    };

    Some(StreamEvent {
        event_type,
        category,
        raw_line: line.to_string(),
        text,
        metadata: payload,
    })
}

fn iter_objects<'a>(value: &'a Value, found: &mut Vec<&'a serde_json::Map<String, Value>>) {
    match value {
        Value::Object(map) => {
            found.push(map);
            for nested in map.values() {
                iter_objects(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                iter_objects(item, found);
            }
        }
        _ => {}
    }
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Bool(b) => Some(u64::from(*b)),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let stripped = s.trim();
            if stripped.is_empty() {
                return None;
            }
            stripped.parse().ok()
        }
        _ => None,
    }
}

/// Lenient float coercion shared with the live budget tracker: numbers,
/// bools, and dollar-prefixed strings.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let mut stripped = s.trim();
            if stripped.is_empty() {
                return None;
            }
            stripped = stripped.strip_prefix('$').unwrap_or(stripped);
            stripped.parse().ok()
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct UsageCandidate {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    total_cost_usd: Option<f64>,
}

impl UsageCandidate {
    fn token_score(&self) -> u32 {
        u32::from(self.input_tokens.is_some()) + u32::from(self.output_tokens.is_some())
    }
}

fn extract_cost(payload: &serde_json::Map<String, Value>) -> Option<f64> {
    COST_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(coerce_f64))
}

fn candidate_from_payload(payload: &serde_json::Map<String, Value>) -> UsageCandidate {
    for (input_key, output_key) in TOKEN_KEY_PAIRS {
        if !payload.contains_key(input_key) && !payload.contains_key(output_key) {
            continue;
        }
        return UsageCandidate {
            input_tokens: payload.get(input_key).and_then(coerce_u64),
            output_tokens: payload.get(output_key).and_then(coerce_u64),
            total_cost_usd: extract_cost(payload),
        };
    }
    UsageCandidate {
        total_cost_usd: extract_cost(payload),
        ..UsageCandidate::default()
    }
}

fn read_json_artifact(
    artifacts: &dyn ArtifactStore,
    run_id: &RunId,
    name: &str,
) -> Option<Value> {
    let key = make_artifact_key(run_id, name);
    if !artifacts.exists(&key) {
        return None;
    }
    let raw = artifacts.get(&key).ok()?;
    serde_json::from_slice(&raw).ok()
}

fn read_json_lines_artifact(
    artifacts: &dyn ArtifactStore,
    run_id: &RunId,
    name: &str,
) -> Vec<Value> {
    let key = make_artifact_key(run_id, name);
    if !artifacts.exists(&key) {
        return Vec::new();
    }
    let Ok(raw) = artifacts.get(&key) else {
        return Vec::new();
    };
    String::from_utf8_lossy(&raw)
        .lines()
        .filter_map(|line| {
            let stripped = line.trim();
            if stripped.is_empty() {
                return None;
            }
            serde_json::from_str::<Value>(stripped)
                .ok()
                .filter(Value::is_object)
        })
        .collect()
}

/// Sweep `tokens.json`, `usage.json`, and `output.jsonl` for usage shapes
/// and pick the candidate with the most populated token fields; cost is the
/// first non-null value from any candidate.
pub fn extract_usage_from_artifacts(artifacts: &dyn ArtifactStore, run_id: &RunId) -> TokenUsage {
    let mut candidates: Vec<UsageCandidate> = Vec::new();

    for name in ["tokens.json", "usage.json"] {
        if let Some(payload) = read_json_artifact(artifacts, run_id, name) {
            let mut objects = Vec::new();
            iter_objects(&payload, &mut objects);
            candidates.extend(objects.iter().map(|obj| candidate_from_payload(obj)));
        }
    }
    for payload in read_json_lines_artifact(artifacts, run_id, "output.jsonl") {
        let mut objects = Vec::new();
        iter_objects(&payload, &mut objects);
        candidates.extend(objects.iter().map(|obj| candidate_from_payload(obj)));
    }

    let Some(best_tokens) = candidates.iter().max_by_key(|c| c.token_score()) else {
        return TokenUsage::default();
    };
    let best_cost = candidates.iter().find_map(|c| c.total_cost_usd);

    if best_tokens.token_score() == 0 && best_cost.is_none() {
        return TokenUsage::default();
    }
    TokenUsage {
        input_tokens: best_tokens.input_tokens.unwrap_or(0),
        output_tokens: best_tokens.output_tokens.unwrap_or(0),
        total_cost_usd: best_cost,
    }
}

/// Prefer the `session_id.txt` artifact; fall back to scanning `output.jsonl`
/// objects for a `session_id`/`sessionId` string.
pub fn extract_session_id_from_artifacts(
    artifacts: &dyn ArtifactStore,
    run_id: &RunId,
) -> Option<String> {
    let key = make_artifact_key(run_id, "session_id.txt");
    if artifacts.exists(&key) {
        let raw = artifacts.get(&key).ok()?;
        let session_id = String::from_utf8_lossy(&raw).trim().to_string();
        return if session_id.is_empty() {
            None
        } else {
            Some(session_id)
        };
    }

    for payload in read_json_lines_artifact(artifacts, run_id, "output.jsonl") {
        let mut objects = Vec::new();
        iter_objects(&payload, &mut objects);
        for obj in objects {
            for key_name in ["session_id", "sessionId"] {
                if let Some(value) = obj.get(key_name).and_then(|v| v.as_str()) {
                    let stripped = value.trim();
                    if !stripped.is_empty() {
                        return Some(stripped.to_string());
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "common_tests.rs"]
mod tests;
