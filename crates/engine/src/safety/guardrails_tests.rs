// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use indexmap::IndexMap;
use std::io::Write;
use tempfile::tempdir;

fn write_script(dir: &Path, name: &str, body: &str, executable: bool) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "{body}").unwrap();
    drop(file);
    if executable {
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
    }
    path
}

fn base_env() -> IndexMap<String, String> {
    let mut env = IndexMap::new();
    env.insert("PATH".to_string(), std::env::var("PATH").unwrap_or_default());
    env
}

#[tokio::test]
async fn test_no_guardrails_is_ok() {
    let result = run_guardrails(
        &[],
        &RunId::from_number(1),
        Path::new("."),
        &base_env(),
        None,
        Path::new("/tmp/output.jsonl"),
        5.0,
    )
    .await;
    assert!(result.ok());
}

#[tokio::test]
async fn test_passing_script() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "check.sh", "exit 0", true);
    let result = run_guardrails(
        &[script],
        &RunId::from_number(1),
        dir.path(),
        &base_env(),
        None,
        Path::new("/tmp/output.jsonl"),
        5.0,
    )
    .await;
    assert!(result.ok());
}

#[tokio::test]
async fn test_failing_script_collects_output() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "check.sh", "echo broken >&2; exit 3", true);
    let result = run_guardrails(
        &[script],
        &RunId::from_number(1),
        dir.path(),
        &base_env(),
        None,
        Path::new("/tmp/output.jsonl"),
        5.0,
    )
    .await;
    assert!(!result.ok());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].exit_code, 3);
    assert_eq!(result.failures[0].stderr, "broken");
}

#[tokio::test]
async fn test_non_executable_script_runs_via_bash() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "check.sh", "exit 0", false);
    let result = run_guardrails(
        &[script],
        &RunId::from_number(1),
        dir.path(),
        &base_env(),
        None,
        Path::new("/tmp/output.jsonl"),
        5.0,
    )
    .await;
    assert!(result.ok());
}

#[tokio::test]
async fn test_timeout_reports_exit_124() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "slow.sh", "sleep 20", true);
    let result = run_guardrails(
        &[script],
        &RunId::from_number(1),
        dir.path(),
        &base_env(),
        None,
        Path::new("/tmp/output.jsonl"),
        0.2,
    )
    .await;
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].exit_code, 124);
}

#[tokio::test]
async fn test_env_exports_and_secret_stripping() {
    let dir = tempdir().unwrap();
    // The script fails when a secret leaks and checks the exports exist.
    let script = write_script(
        dir.path(),
        "env.sh",
        r#"[ -z "$MERIDIAN_SECRET_API" ] || exit 9
[ "$MERIDIAN_GUARDRAIL_RUN_ID" = "r7" ] || exit 8
[ -n "$MERIDIAN_GUARDRAIL_OUTPUT_LOG" ] || exit 7
[ "$MERIDIAN_GUARDRAIL_REPORT_PATH" = "/tmp/report.md" ] || exit 6
exit 0"#,
        true,
    );
    let mut env = base_env();
    env.insert("MERIDIAN_SECRET_API".to_string(), "leaky".to_string());

    let result = run_guardrails(
        &[script],
        &RunId::from_number(7),
        dir.path(),
        &env,
        Some(Path::new("/tmp/report.md")),
        Path::new("/tmp/output.jsonl"),
        5.0,
    )
    .await;
    assert!(result.ok(), "failures: {:?}", result.failures);
}

#[test]
fn test_normalize_guardrail_paths() {
    let dir = tempdir().unwrap();
    let first = write_script(dir.path(), "a.sh", "exit 0", true);
    write_script(dir.path(), "b.sh", "exit 0", true);

    let resolved =
        normalize_guardrail_paths(&["a.sh,b.sh".to_string()], dir.path()).unwrap();
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0], first);

    let err = normalize_guardrail_paths(&["missing.sh".to_string()], dir.path()).unwrap_err();
    assert!(matches!(err, EngineError::GuardrailNotFound(_)));

    // Empty segments are skipped.
    assert!(normalize_guardrail_paths(&[" , ".to_string()], dir.path())
        .unwrap()
        .is_empty());
}
