// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-store integrity and crash-recovery specs

use crate::prelude::*;
use serial_test::serial;
use similar_asserts::assert_eq as assert_text_eq;
use std::io::Write;

fn start(space_dir: &std::path::Path, run_id: Option<&str>) -> RunId {
    mdn_storage::start_run(
        space_dir,
        mdn_storage::StartRun {
            run_id: run_id.map(RunId::from_string),
            chat_id: ChatId::from_number(1),
            model: ModelId::new("sonnet"),
            agent: None,
            harness: mdn_core::HarnessId::new("claude"),
            prompt: "p".to_string(),
            harness_session_id: None,
            started_at: Some("2026-01-05T12:00:00Z".to_string()),
        },
    )
    .expect("start_run")
}

fn finalize(space_dir: &std::path::Path, run_id: &RunId, exit_code: i32, status: RunStatus) {
    mdn_storage::finalize_run(
        space_dir,
        run_id,
        mdn_storage::FinalizeOutcome {
            status,
            exit_code,
            finished_at: Some("2026-01-05T12:00:05Z".to_string()),
            duration_secs: Some(5.0),
            ..mdn_storage::FinalizeOutcome::default()
        },
    )
    .expect("finalize_run");
}

#[test]
#[serial]
fn spec_every_run_has_one_start_and_finalize_follows_in_file_order() {
    let space = SpecSpace::new();

    // Interleave two runs the way concurrent workers would.
    let first = start(&space.space_dir, None);
    let second = start(&space.space_dir, None);
    finalize(&space.space_dir, &second, 1, RunStatus::Failed);
    finalize(&space.space_dir, &first, 0, RunStatus::Succeeded);

    let raw = space.raw_runs_log();
    let events: Vec<serde_json::Value> = raw
        .lines()
        .map(|line| serde_json::from_str(line).expect("parseable line"))
        .collect();
    assert_eq!(events.len(), 4);

    for run_id in [&first, &second] {
        let starts: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e["id"] == run_id.as_str() && e["event"] == "start")
            .map(|(index, _)| index)
            .collect();
        let finalizes: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e["id"] == run_id.as_str() && e["event"] == "finalize")
            .map(|(index, _)| index)
            .collect();
        assert_eq!(starts.len(), 1, "exactly one start for {run_id}");
        assert_eq!(finalizes.len(), 1, "exactly one finalize for {run_id}");
        assert!(starts[0] < finalizes[0], "finalize after start");
    }

    for run in space.runs() {
        assert!(matches!(
            run.status,
            RunStatus::Succeeded | RunStatus::Failed
        ));
    }
}

#[test]
#[serial]
fn spec_event_lines_are_sorted_key_json() {
    let space = SpecSpace::new();
    let run_id = start(&space.space_dir, Some("r1"));
    finalize(&space.space_dir, &run_id, 0, RunStatus::Succeeded);

    let raw = space.raw_runs_log();
    let first_line = raw.lines().next().expect("start line");
    assert_text_eq!(
        first_line,
        "{\"agent\":null,\"chat_id\":\"c1\",\"event\":\"start\",\"harness\":\"claude\",\
         \"id\":\"r1\",\"model\":\"sonnet\",\"prompt\":\"p\",\
         \"started_at\":\"2026-01-05T12:00:00Z\",\"status\":\"running\",\"v\":1}"
    );
}

#[test]
#[serial]
fn spec_truncated_trailing_line_is_skipped_and_appendable() {
    let space = SpecSpace::new();
    let run_id = start(&space.space_dir, None);

    // Crash mid-append: a partial finalize with no newline.
    {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(space.space_dir.join("runs.jsonl"))
            .expect("open log");
        file.write_all(b"{\"event\":\"finalize\",\"id\":\"r1\",\"sta")
            .expect("write torn bytes");
    }

    // The torn line is invisible to readers.
    let runs = space.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Running);

    // And appending still produces a well-formed log.
    finalize(&space.space_dir, &run_id, 0, RunStatus::Succeeded);
    let runs = space.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Succeeded);
    assert_eq!(runs[0].exit_code, Some(0));
}

#[test]
#[serial]
fn spec_run_ids_are_strictly_monotonic() {
    let space = SpecSpace::new();
    let mut last = 0;
    for _ in 0..5 {
        let run_id = start(&space.space_dir, None);
        let n = run_id.number().expect("numeric id");
        assert!(n > last, "{n} > {last}");
        last = n;
    }
}

#[test]
#[serial]
fn spec_space_lifecycle_create_close_reopen() {
    let space = SpecSpace::new();
    let record = mdn_storage::create_space(space.repo.path(), Some("demo")).expect("create");
    assert_eq!(record.status, mdn_core::SpaceStatus::Active);

    let closed = mdn_storage::update_space_status(
        space.repo.path(),
        &record.id,
        mdn_core::SpaceStatus::Closed,
    )
    .expect("close");
    assert!(closed.finished_at.is_some());

    let reopened = mdn_storage::update_space_status(
        space.repo.path(),
        &record.id,
        mdn_core::SpaceStatus::Active,
    )
    .expect("reopen");
    assert_eq!(reopened.status, mdn_core::SpaceStatus::Active);
    assert!(reopened.finished_at.is_none());
}
