// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mdn_core::ArtifactKey;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Minimal in-memory artifact store; the real one lives in mdn-storage and
/// this crate must not depend on it.
#[derive(Default)]
struct MapStore {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MapStore {
    fn with(entries: &[(&str, &[u8])]) -> Self {
        let store = Self::default();
        for (key, data) in entries {
            store.data.lock().insert(key.to_string(), data.to_vec());
        }
        store
    }
}

impl ArtifactStore for MapStore {
    fn put(&self, key: &ArtifactKey, data: &[u8]) -> Result<(), mdn_core::ArtifactError> {
        self.data.lock().insert(key.as_str().to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &ArtifactKey) -> Result<Vec<u8>, mdn_core::ArtifactError> {
        self.data
            .lock()
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| mdn_core::ArtifactError::NotFound(key.as_str().to_string()))
    }

    fn exists(&self, key: &ArtifactKey) -> bool {
        self.data.lock().contains_key(key.as_str())
    }

    fn delete(&self, key: &ArtifactKey) -> Result<(), mdn_core::ArtifactError> {
        self.data.lock().remove(key.as_str());
        Ok(())
    }

    fn list(&self, run_id: &RunId) -> Vec<ArtifactKey> {
        let prefix = format!("{}/", run_id.as_str());
        self.data
            .lock()
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .map(ArtifactKey::new)
            .collect()
    }
}

#[test]
fn test_parse_non_json_line_is_synthetic() {
    let event = parse_stream_event("plain text", &[], EventCategory::System).unwrap();
    assert_eq!(event.event_type, "line");
    assert_eq!(event.category, EventCategory::System);
    assert_eq!(event.text.as_deref(), Some("plain text"));
}

#[test]
fn test_parse_blank_line_is_none() {
    assert!(parse_stream_event("   ", &[], EventCategory::System).is_none());
}

#[test]
fn test_parse_categorizes_via_exact_map() {
    let map = [("result", EventCategory::Lifecycle)];
    let event =
        parse_stream_event(r#"{"type":"result","text":"done"}"#, &map, EventCategory::System)
            .unwrap();
    assert_eq!(event.event_type, "result");
    assert_eq!(event.category, EventCategory::Lifecycle);
    assert_eq!(event.text.as_deref(), Some("done"));
}

#[test]
fn test_parse_unknown_type_falls_to_default() {
    let event = parse_stream_event(r#"{"type":"mystery"}"#, &[], EventCategory::Progress).unwrap();
    assert_eq!(event.category, EventCategory::Progress);
}

#[test]
fn test_subrun_protocol_lines_always_categorize_as_subrun() {
    let line = r#"{"v":1,"t":"meridian.run.start","id":"r4","model":"m","d":1,"ts":1700000000}"#;
    let event = parse_stream_event(line, &[], EventCategory::System).unwrap();
    assert_eq!(event.event_type, "meridian.run.start");
    assert_eq!(event.category, EventCategory::SubRun);
    assert_eq!(event.metadata_int("d"), Some(1));
    assert_eq!(event.metadata["id"], "r4");
}

#[test]
fn test_usage_prefers_most_populated_token_candidate() {
    let run_id = RunId::from_number(1);
    let store = MapStore::with(&[
        (
            "r1/output.jsonl",
            br#"{"usage":{"input_tokens":10}}
{"tokens":{"input_tokens":25,"output_tokens":7}}
"#,
        ),
    ]);
    let usage = extract_usage_from_artifacts(&store, &run_id);
    assert_eq!(usage.input_tokens, 25);
    assert_eq!(usage.output_tokens, 7);
    assert_eq!(usage.total_cost_usd, None);
}

#[test]
fn test_usage_cost_is_first_non_null_candidate() {
    let run_id = RunId::from_number(1);
    let store = MapStore::with(&[(
        "r1/tokens.json",
        br#"{"input_tokens":5,"output_tokens":2,"total_cost_usd":0.03}"#,
    )]);
    let usage = extract_usage_from_artifacts(&store, &run_id);
    assert_eq!(usage.input_tokens, 5);
    assert_eq!(usage.total_cost_usd, Some(0.03));
}

#[test]
fn test_usage_coerces_alternate_spellings_and_strings() {
    let run_id = RunId::from_number(2);
    let store = MapStore::with(&[(
        "r2/output.jsonl",
        br#"{"usage":{"prompt_tokens":"120","completion_tokens":"45","cost":"$0.20"}}
"#,
    )]);
    let usage = extract_usage_from_artifacts(&store, &run_id);
    assert_eq!(usage.input_tokens, 120);
    assert_eq!(usage.output_tokens, 45);
    assert_eq!(usage.total_cost_usd, Some(0.20));
}

#[test]
fn test_usage_empty_when_nothing_found() {
    let run_id = RunId::from_number(3);
    let store = MapStore::with(&[("r3/output.jsonl", br#"{"role":"assistant"}
"#)]);
    assert!(extract_usage_from_artifacts(&store, &run_id).is_empty());
    assert!(extract_usage_from_artifacts(&MapStore::default(), &run_id).is_empty());
}

#[test]
fn test_session_id_prefers_explicit_artifact() {
    let run_id = RunId::from_number(1);
    let store = MapStore::with(&[
        ("r1/session_id.txt", b"  sess-explicit \n"),
        ("r1/output.jsonl", br#"{"session_id":"sess-stream"}
"#),
    ]);
    assert_eq!(
        extract_session_id_from_artifacts(&store, &run_id).as_deref(),
        Some("sess-explicit")
    );
}

#[test]
fn test_session_id_falls_back_to_output_scan() {
    let run_id = RunId::from_number(1);
    let store = MapStore::with(&[(
        "r1/output.jsonl",
        br#"{"type":"init","nested":{"sessionId":"sess-nested"}}
"#,
    )]);
    assert_eq!(
        extract_session_id_from_artifacts(&store, &run_id).as_deref(),
        Some("sess-nested")
    );
    assert_eq!(
        extract_session_id_from_artifacts(&MapStore::default(), &run_id),
        None
    );
}
