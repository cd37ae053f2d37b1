// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end run execution specs

use crate::prelude::*;
use serial_test::serial;
use std::time::{Duration, Instant};

#[tokio::test]
#[serial]
async fn spec_successful_simple_run() {
    let space = SpecSpace::new();
    let ctx = space.context();
    let script = r#"echo '{"tokens":{"input_tokens":10,"output_tokens":3,"total_cost_usd":0.01}}'
echo '{"role":"assistant","content":"done"}'"#;

    let outcome = space.run_script(script, &ctx).await;
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.status, RunStatus::Succeeded);

    let runs = space.runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.exit_code, Some(0));
    assert_eq!(run.input_tokens, Some(10));
    assert_eq!(run.output_tokens, Some(3));
    assert_eq!(run.total_cost_usd, Some(0.01));
    assert_eq!(run.prompt.as_deref(), Some("Fix bug"));
    assert_eq!(run.model.as_ref().map(|m| m.as_str()), Some("gpt-5.3-codex"));

    let report = space.artifact_text(&outcome.run_id, "report.md");
    assert!(report.contains("done"), "report: {report}");
    let on_disk = space
        .space_dir
        .join("runs")
        .join(outcome.run_id.as_str())
        .join("report.md");
    assert!(std::fs::read_to_string(on_disk).unwrap().contains("done"));
}

#[tokio::test]
#[serial]
async fn spec_per_run_budget_breach_mid_stream() {
    let space = SpecSpace::new();
    let mut ctx = space.context();
    ctx.budget = Some(Budget {
        per_run_usd: Some(0.2),
        per_workspace_usd: None,
    });
    ctx.max_retries = 0;
    let script = r#"echo '{"tokens":{"total_cost_usd":0.8}}'; sleep 20"#;

    let started = Instant::now();
    let outcome = space.run_script(script, &ctx).await;
    assert!(started.elapsed() < Duration::from_secs(10), "terminated early");
    assert_eq!(outcome.exit_code, 2);
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.failure_reason.as_deref(), Some("budget_exceeded"));

    let runs = space.runs();
    assert_eq!(runs[0].exit_code, Some(2));
    assert_eq!(runs[0].error.as_deref(), Some("budget_exceeded"));
}

#[tokio::test]
#[serial]
async fn spec_timeout_kills_hanging_harness() {
    let space = SpecSpace::new();
    let mut ctx = space.context();
    ctx.timeout_secs = Some(0.2);
    ctx.max_retries = 0;

    let started = Instant::now();
    let outcome = space.run_script("sleep 30", &ctx).await;
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(outcome.exit_code, 3);
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.failure_reason.as_deref(), Some("timeout"));

    let runs = space.runs();
    assert_eq!(runs[0].exit_code, Some(3));
    assert_eq!(runs[0].error.as_deref(), Some("timeout"));
}

#[tokio::test]
#[serial]
async fn spec_retryable_network_error_then_success() {
    let space = SpecSpace::new();
    let mut ctx = space.context();
    ctx.max_retries = 3;

    let marker = space.repo.path().join("attempted");
    let spawns = space.repo.path().join("spawns");
    let script = format!(
        r#"echo spawn >> {spawns}
if [ -f {marker} ]; then echo '{{"role":"assistant","content":"ok"}}'; else touch {marker}; echo 'network error: connection reset' >&2; exit 1; fi"#,
        spawns = spawns.display(),
        marker = marker.display()
    );

    let outcome = space.run_script(&script, &ctx).await;
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.status, RunStatus::Succeeded);

    // Exactly two child spawns, one start event, one finalize event.
    let spawn_count = std::fs::read_to_string(&spawns).unwrap().lines().count();
    assert_eq!(spawn_count, 2);
    let raw = space.raw_runs_log();
    assert_eq!(raw.matches("\"event\":\"start\"").count(), 1);
    assert_eq!(raw.matches("\"event\":\"finalize\"").count(), 1);
}

#[tokio::test]
#[serial]
async fn spec_guardrail_failure_then_success() {
    let space = SpecSpace::new();
    let mut ctx = space.context();
    ctx.max_retries = 2;

    let gate = space.repo.path().join("gate");
    let guard_runs = space.repo.path().join("guard-runs");
    let guardrail = space.repo.path().join("guard.sh");
    std::fs::write(
        &guardrail,
        format!(
            "#!/bin/sh\necho ran >> {guard_runs}\nif [ -f {gate} ]; then exit 0; else touch {gate}; exit 1; fi\n",
            guard_runs = guard_runs.display(),
            gate = gate.display()
        ),
    )
    .unwrap();
    ctx.guardrails = vec![guardrail];

    let spawns = space.repo.path().join("spawns");
    let script = format!(
        r#"echo spawn >> {}; echo '{{"role":"assistant","content":"ok"}}'"#,
        spawns.display()
    );

    let outcome = space.run_script(&script, &ctx).await;
    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(
        std::fs::read_to_string(&spawns).unwrap().lines().count(),
        2
    );
    assert_eq!(
        std::fs::read_to_string(&guard_runs).unwrap().lines().count(),
        2
    );
}

#[tokio::test]
#[serial]
async fn spec_secrets_never_reach_artifacts_or_events() {
    let space = SpecSpace::new();
    let mut ctx = space.context();
    ctx.secrets = vec![SecretSpec::new("DB", "swordfish")];
    ctx.max_retries = 0;

    // The child receives the secret via env and leaks it on both streams.
    let script = r#"echo "stdout leak: $MERIDIAN_SECRET_DB"
echo "stderr leak: $MERIDIAN_SECRET_DB" >&2"#;

    let outcome = space.run_script(script, &ctx).await;
    let output = space.artifact_text(&outcome.run_id, "output.jsonl");
    let stderr = space.artifact_text(&outcome.run_id, "stderr.log");
    let report = space.artifact_text(&outcome.run_id, "report.md");
    let events = space.raw_runs_log();

    assert!(output.contains("stdout leak: [REDACTED:DB]"), "{output}");
    for captured in [&output, &stderr, &report, &events] {
        assert!(!captured.contains("swordfish"), "leak in: {captured}");
    }
}

#[tokio::test]
#[serial]
async fn spec_exit_code_table_for_plain_failures() {
    let space = SpecSpace::new();
    let mut ctx = space.context();
    ctx.max_retries = 0;

    let outcome = space.run_script("echo boom >&2; exit 42", &ctx).await;
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(outcome.status, RunStatus::Failed);
}
