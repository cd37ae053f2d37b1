// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn start_event() -> RunEvent {
    RunEvent::Start {
        v: 1,
        id: RunId::from_number(1),
        chat_id: ChatId::from_number(1),
        model: ModelId::new("gpt-5.3-codex"),
        agent: None,
        harness: HarnessId::new("codex"),
        status: RunStatus::Running,
        started_at: "2026-01-05T12:00:00Z".to_string(),
        prompt: "Fix bug".to_string(),
        harness_session_id: None,
    }
}

#[test]
fn test_start_event_serializes_with_tag_and_null_agent() {
    let json = serde_json::to_value(start_event()).unwrap();
    assert_eq!(json["event"], "start");
    assert_eq!(json["v"], 1);
    assert_eq!(json["status"], "running");
    assert!(json.as_object().unwrap().contains_key("agent"));
    assert!(json["agent"].is_null());
    assert!(!json.as_object().unwrap().contains_key("harness_session_id"));
}

#[test]
fn test_finalize_event_omits_absent_fields() {
    let event = RunEvent::Finalize {
        v: 1,
        id: RunId::from_number(1),
        status: RunStatus::Succeeded,
        exit_code: 0,
        finished_at: "2026-01-05T12:00:05Z".to_string(),
        duration_secs: Some(5.0),
        total_cost_usd: None,
        input_tokens: None,
        output_tokens: None,
        error: None,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "finalize");
    assert_eq!(json["exit_code"], 0);
    assert!(!json.as_object().unwrap().contains_key("total_cost_usd"));
    assert!(!json.as_object().unwrap().contains_key("error"));
}

#[test]
fn test_event_round_trip() {
    let event = start_event();
    let line = serde_json::to_string(&event).unwrap();
    let back: RunEvent = serde_json::from_str(&line).unwrap();
    assert_eq!(back, event);
}

#[test]
fn test_record_fold_overlays_finalize() {
    let mut record = RunRecord::empty(RunId::from_number(1));
    record.apply(&start_event());
    assert_eq!(record.status, RunStatus::Running);
    assert_eq!(record.prompt.as_deref(), Some("Fix bug"));

    record.apply(&RunEvent::Finalize {
        v: 1,
        id: RunId::from_number(1),
        status: RunStatus::Failed,
        exit_code: 2,
        finished_at: "2026-01-05T12:00:05Z".to_string(),
        duration_secs: Some(4.2),
        total_cost_usd: Some(0.01),
        input_tokens: Some(10),
        output_tokens: Some(3),
        error: Some("budget_exceeded".to_string()),
    });
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.exit_code, Some(2));
    assert_eq!(record.error.as_deref(), Some("budget_exceeded"));
    // Start-provided identity survives the overlay.
    assert_eq!(record.model.as_ref().map(|m| m.as_str()), Some("gpt-5.3-codex"));
}

#[test]
fn test_finalize_does_not_clear_earlier_values() {
    let mut record = RunRecord::empty(RunId::from_number(2));
    record.apply(&RunEvent::Finalize {
        v: 1,
        id: RunId::from_number(2),
        status: RunStatus::Succeeded,
        exit_code: 0,
        finished_at: "2026-01-05T12:00:05Z".to_string(),
        duration_secs: Some(1.0),
        total_cost_usd: Some(0.5),
        input_tokens: None,
        output_tokens: None,
        error: None,
    });
    // A second finalize without cost must not wipe the recorded cost.
    record.apply(&RunEvent::Finalize {
        v: 1,
        id: RunId::from_number(2),
        status: RunStatus::Succeeded,
        exit_code: 0,
        finished_at: "2026-01-05T12:00:06Z".to_string(),
        duration_secs: None,
        total_cost_usd: None,
        input_tokens: None,
        output_tokens: None,
        error: None,
    });
    assert_eq!(record.total_cost_usd, Some(0.5));
    assert_eq!(record.duration_secs, Some(1.0));
}
