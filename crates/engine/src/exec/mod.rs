// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run execution: the spawn → stream → finalize state machine
//!
//! `execute_run` drives one run to completion. Exactly one `start` event and
//! exactly one `finalize` event are appended per run, even when the body
//! fails; only a parent SIGKILL mid-append is irrecoverable, and the tolerant
//! log reader heals that at read time.

pub mod signal;
pub mod spawn;
pub mod terminal;

use crate::error::EngineError;
use crate::extract::{enrich_finalize, reset_attempt_artifacts, FinalizeExtraction};
use crate::safety::budget::LiveBudgetTracker;
use crate::safety::classify::{classify_error, should_retry, ErrorCategory};
use crate::safety::env::{sanitize_child_env, HARNESS_ENV_PASS_THROUGH};
use crate::safety::guardrails::{run_guardrails, GuardrailFailure};
use crate::subrun;
use indexmap::IndexMap;
use mdn_adapters::{HarnessAdapter, PermissionResolver, RunParams};
use mdn_core::{
    make_artifact_key, redact_secret_bytes, secrets_env_overrides, ArtifactStore, Budget, ChatId,
    ModelId, PermissionConfig, RunId, RunStatus, SecretSpec, StreamObserver,
};
use mdn_storage::{finalize_run, start_run, FinalizeOutcome, StartRun};
use self::signal::SigtermMask;
use self::spawn::{spawn_and_stream, SpawnRequest, SpawnResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const OUTPUT_FILENAME: &str = "output.jsonl";
const STDERR_FILENAME: &str = "stderr.log";
const REPORT_FILENAME: &str = "report.md";
const DEFAULT_INFRA_EXIT_CODE: i32 = 2;

/// Prepared inputs for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Pre-allocated run ID; `None` allocates the next `r<N>` at start.
    pub run_id: Option<RunId>,
    pub chat_id: ChatId,
    pub prompt: String,
    pub model: ModelId,
    pub agent: Option<String>,
    pub skills: Vec<String>,
    pub extra_args: Vec<String>,
    pub continue_session_id: Option<String>,
    pub continue_fork: bool,
}

/// Execution-environment bundle for one run.
pub struct ExecuteContext {
    pub cwd: PathBuf,
    pub timeout_secs: Option<f64>,
    pub kill_grace_secs: f64,
    pub env_overrides: Vec<(String, String)>,
    pub secrets: Vec<SecretSpec>,
    pub budget: Option<Budget>,
    pub workspace_spent_usd: f64,
    pub max_retries: u32,
    pub retry_backoff_secs: f64,
    pub guardrails: Vec<PathBuf>,
    pub guardrail_timeout_secs: f64,
    pub permission_config: PermissionConfig,
    pub observer: Option<Arc<dyn StreamObserver>>,
    pub stream_stdout_to_terminal: bool,
    pub stream_stderr_to_terminal: bool,
    pub cancel: CancellationToken,
}

impl ExecuteContext {
    /// Context with config defaults rooted at one working directory.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let defaults = mdn_core::MeridianConfig::default();
        Self {
            cwd: cwd.into(),
            timeout_secs: None,
            kill_grace_secs: defaults.kill_grace_secs,
            env_overrides: Vec::new(),
            secrets: Vec::new(),
            budget: None,
            workspace_spent_usd: 0.0,
            max_retries: defaults.max_retries,
            retry_backoff_secs: defaults.retry_backoff_secs,
            guardrails: Vec::new(),
            guardrail_timeout_secs: defaults.guardrail_timeout_secs,
            permission_config: PermissionConfig::default(),
            observer: None,
            stream_stdout_to_terminal: false,
            stream_stderr_to_terminal: false,
            cancel: CancellationToken::new(),
        }
    }
}

/// Observable outcome of one executed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub exit_code: i32,
    pub status: RunStatus,
    pub failure_reason: Option<String>,
    /// Harness-native session ID extracted from the run's artifacts.
    pub harness_session_id: Option<String>,
}

fn status_for(exit_code: i32, failure_reason: &mut Option<String>) -> RunStatus {
    match exit_code {
        0 => RunStatus::Succeeded,
        130 | 143 => {
            if failure_reason.is_none() {
                *failure_reason = Some("interrupted".to_string());
            }
            RunStatus::Cancelled
        }
        _ => RunStatus::Failed,
    }
}

fn build_child_env(
    run_id: &RunId,
    repo_root: &Path,
    space_dir: &Path,
    adapter: &dyn HarnessAdapter,
    ctx: &ExecuteContext,
    depth: u32,
) -> IndexMap<String, String> {
    let mut overrides: Vec<(String, String)> = Vec::new();

    // Meridian run context survives nesting without forwarding unrelated
    // parent environment.
    for (key, value) in std::env::vars() {
        if key.starts_with("MERIDIAN_") {
            overrides.push((key, value));
        }
    }
    overrides.push(("MERIDIAN_DEPTH".to_string(), (depth + 1).to_string()));
    overrides.push((
        "MERIDIAN_PARENT_RUN_ID".to_string(),
        run_id.as_str().to_string(),
    ));
    if let Some(space_name) = space_dir.file_name().and_then(|name| name.to_str()) {
        overrides.push(("MERIDIAN_SPACE_ID".to_string(), space_name.to_string()));
    }
    overrides.extend(secrets_env_overrides(&ctx.secrets));

    // Caller overrides, then runtime paths, then adapter overrides.
    overrides.extend(ctx.env_overrides.iter().cloned());
    overrides.push((
        "MERIDIAN_REPO_ROOT".to_string(),
        repo_root.display().to_string(),
    ));
    overrides.push((
        "MERIDIAN_STATE_ROOT".to_string(),
        mdn_storage::resolve_state_paths(repo_root)
            .root_dir
            .display()
            .to_string(),
    ));
    overrides.extend(adapter.env_overrides(&ctx.permission_config));

    sanitize_child_env(std::env::vars(), &overrides, &HARNESS_ENV_PASS_THROUGH)
}

fn guardrail_failure_text(failures: &[GuardrailFailure]) -> String {
    let mut lines = vec!["Guardrail validation failed:".to_string()];
    for failure in failures {
        let mut line = format!("- {} (exit {})", failure.script, failure.exit_code);
        if !failure.stderr.is_empty() {
            line.push_str(": ");
            line.push_str(&failure.stderr);
        }
        lines.push(line);
    }
    lines.join("\n")
}

fn append_text_to_stderr_artifact(
    artifacts: &dyn ArtifactStore,
    run_id: &RunId,
    text: &str,
    secrets: &[SecretSpec],
) {
    let key = make_artifact_key(run_id, STDERR_FILENAME);
    let existing = if artifacts.exists(&key) {
        artifacts
            .get(&key)
            .map(|raw| String::from_utf8_lossy(&raw).into_owned())
            .unwrap_or_default()
    } else {
        String::new()
    };
    let prefix = if !existing.is_empty() && !existing.ends_with('\n') {
        "\n"
    } else {
        ""
    };
    let combined = format!("{existing}{prefix}{text}\n");
    let _ = artifacts.put(&key, &redact_secret_bytes(combined.as_bytes(), secrets));
}

fn stderr_artifact_text(artifacts: &dyn ArtifactStore, run_id: &RunId) -> String {
    let key = make_artifact_key(run_id, STDERR_FILENAME);
    if !artifacts.exists(&key) {
        return String::new();
    }
    artifacts
        .get(&key)
        .map(|raw| String::from_utf8_lossy(&raw).into_owned())
        .unwrap_or_default()
}

struct LoopOutcome {
    exit_code: i32,
    failure_reason: Option<String>,
    extracted: Option<FinalizeExtraction>,
}

/// Execute one run: append `start`, drive the retry loop, always append
/// `finalize` under a SIGTERM mask, and return the mapped outcome.
pub async fn execute_run(
    run: &RunRequest,
    repo_root: &Path,
    space_dir: &Path,
    artifacts: &dyn ArtifactStore,
    adapter: &dyn HarnessAdapter,
    perms: &dyn PermissionResolver,
    ctx: &ExecuteContext,
) -> Result<RunOutcome, EngineError> {
    let depth = subrun::current_depth()?;
    let max_depth = subrun::max_depth()?;

    let run_id = start_run(
        space_dir,
        StartRun {
            run_id: run.run_id.clone(),
            chat_id: run.chat_id.clone(),
            model: run.model.clone(),
            agent: run.agent.clone(),
            harness: adapter.id(),
            prompt: run.prompt.clone(),
            harness_session_id: run.continue_session_id.clone(),
            started_at: None,
        },
    )?;
    subrun::emit_run_start(&run_id, run.model.as_str(), run.agent.as_deref(), depth);

    let log_dir = space_dir.join("runs").join(run_id.as_str());
    let started = Instant::now();

    // Depth bound: refuse to nest deeper, without spawning.
    if let Some(max_depth) = max_depth {
        if depth >= max_depth {
            tracing::warn!(run_id = %run_id, depth, max_depth, "max agent depth reached");
            return finalize_and_return(FinalizePlan {
                space_dir,
                run_id,
                exit_code: 1,
                failure_reason: Some("max_depth_exceeded".to_string()),
                extracted: None,
                duration_secs: started.elapsed().as_secs_f64(),
                depth,
            });
        }
    }

    let outcome = run_attempt_loop(
        run, &run_id, repo_root, space_dir, &log_dir, artifacts, adapter, perms, ctx, depth,
    )
    .await;

    let (exit_code, failure_reason, extracted) = match outcome {
        Ok(LoopOutcome {
            exit_code,
            failure_reason,
            extracted,
        }) => (exit_code, failure_reason, extracted),
        Err(err) => {
            tracing::error!(run_id = %run_id, error = %err, "run execution failed with infrastructure error");
            (
                DEFAULT_INFRA_EXIT_CODE,
                Some("infra_error".to_string()),
                None,
            )
        }
    };

    finalize_and_return(FinalizePlan {
        space_dir,
        run_id,
        exit_code,
        failure_reason,
        extracted,
        duration_secs: started.elapsed().as_secs_f64(),
        depth,
    })
}

struct FinalizePlan<'a> {
    space_dir: &'a Path,
    run_id: RunId,
    exit_code: i32,
    failure_reason: Option<String>,
    extracted: Option<FinalizeExtraction>,
    duration_secs: f64,
    depth: u32,
}

fn finalize_and_return(plan: FinalizePlan<'_>) -> Result<RunOutcome, EngineError> {
    let FinalizePlan {
        space_dir,
        run_id,
        exit_code,
        mut failure_reason,
        extracted,
        duration_secs,
        depth,
    } = plan;

    let status = status_for(exit_code, &mut failure_reason);
    let usage = extracted
        .as_ref()
        .map(|e| e.usage)
        .filter(|usage| !usage.is_empty());
    let tokens_total = usage.map(|u| u.input_tokens + u.output_tokens);

    let outcome = FinalizeOutcome {
        status,
        exit_code,
        duration_secs: Some(duration_secs),
        total_cost_usd: usage.and_then(|u| u.total_cost_usd),
        input_tokens: usage.map(|u| u.input_tokens),
        output_tokens: usage.map(|u| u.output_tokens),
        error: failure_reason.clone(),
        finished_at: None,
    };

    {
        // Keep finalize persistence atomic against parent SIGTERM.
        let _mask = SigtermMask::install();
        finalize_run(space_dir, &run_id, outcome)?;
    }
    subrun::emit_run_done(&run_id, exit_code, duration_secs, tokens_total, depth);

    Ok(RunOutcome {
        run_id,
        exit_code,
        status,
        failure_reason,
        harness_session_id: extracted.and_then(|e| e.session_id),
    })
}

#[allow(clippy::too_many_arguments)]
async fn run_attempt_loop(
    run: &RunRequest,
    run_id: &RunId,
    repo_root: &Path,
    space_dir: &Path,
    log_dir: &Path,
    artifacts: &dyn ArtifactStore,
    adapter: &dyn HarnessAdapter,
    perms: &dyn PermissionResolver,
    ctx: &ExecuteContext,
    depth: u32,
) -> Result<LoopOutcome, EngineError> {
    let output_log_path = log_dir.join(OUTPUT_FILENAME);
    let stderr_log_path = log_dir.join(STDERR_FILENAME);
    let report_path = log_dir.join(REPORT_FILENAME);

    let child_env = build_child_env(run_id, repo_root, space_dir, adapter, ctx, depth);

    let run_params = RunParams {
        prompt: run.prompt.clone(),
        model: run.model.clone(),
        skills: run.skills.clone(),
        agent: run.agent.clone(),
        extra_args: run.extra_args.clone(),
        continue_session_id: run.continue_session_id.clone(),
        continue_fork: run.continue_fork,
    };
    let command = match harness_command_override() {
        Some(command) => command,
        None => adapter.build_command(&run_params, perms)?,
    };

    let mut budget_tracker = ctx
        .budget
        .map(|budget| LiveBudgetTracker::new(budget, ctx.workspace_spent_usd));
    let preflight_breach = budget_tracker.as_ref().and_then(|tracker| tracker.check());

    let timeout = ctx.timeout_secs.map(Duration::from_secs_f64);
    let kill_grace = Duration::from_secs_f64(ctx.kill_grace_secs.max(0.0));

    let mut exit_code;
    let mut failure_reason: Option<String>;
    let mut extracted: Option<FinalizeExtraction> = None;
    let mut retries_attempted: u32 = 0;

    loop {
        reset_attempt_artifacts(artifacts, run_id, log_dir)?;
        failure_reason = None;

        if let Some(breach) = preflight_breach {
            tracing::warn!(run_id = %run_id, scope = %breach.scope, "budget exceeded before spawn");
            exit_code = DEFAULT_INFRA_EXIT_CODE;
            failure_reason = Some("budget_exceeded".to_string());
            break;
        }

        let spawn_result: SpawnResult = spawn_and_stream(
            SpawnRequest {
                run_id,
                command: &command,
                cwd: &ctx.cwd,
                env: &child_env,
                artifacts,
                output_log_path: output_log_path.clone(),
                stderr_log_path: stderr_log_path.clone(),
                timeout,
                kill_grace,
                secrets: &ctx.secrets,
                adapter,
                observer: ctx.observer.as_deref(),
                stream_stdout_to_terminal: ctx.stream_stdout_to_terminal,
                stream_stderr_to_terminal: ctx.stream_stderr_to_terminal,
                cancel: &ctx.cancel,
            },
            budget_tracker.as_mut(),
        )
        .await?;
        exit_code = spawn_result.exit_code;

        // A harness may write report.md directly; redact it in place before
        // extraction reads it.
        if report_path.exists() {
            let raw = std::fs::read(&report_path).map_err(|e| EngineError::io(&report_path, e))?;
            let redacted = redact_secret_bytes(&raw, &ctx.secrets);
            std::fs::write(&report_path, &redacted)
                .map_err(|e| EngineError::io(&report_path, e))?;
            artifacts.put(&make_artifact_key(run_id, REPORT_FILENAME), &redacted)?;
        }

        let extraction = enrich_finalize(artifacts, adapter, run_id, log_dir, &ctx.secrets)?;

        if spawn_result.budget_breach.is_some() {
            failure_reason = Some("budget_exceeded".to_string());
            extracted = Some(extraction);
            break;
        }

        // Some harnesses emit usage only at the end; recheck with the
        // extracted cost.
        if let (Some(tracker), Some(cost)) =
            (budget_tracker.as_mut(), extraction.usage.total_cost_usd)
        {
            if tracker.observe_cost(cost).is_some() {
                failure_reason = Some("budget_exceeded".to_string());
                exit_code = DEFAULT_INFRA_EXIT_CODE;
                extracted = Some(extraction);
                break;
            }
        }

        if spawn_result.cancelled {
            exit_code = 130;
            extracted = Some(extraction);
            break;
        }

        if exit_code == 0 && extraction.output_is_empty {
            // A successful exit with no content is unusable; fail fast so
            // supervisors can react.
            exit_code = 1;
            failure_reason = Some("empty_output".to_string());
            extracted = Some(extraction);
            break;
        }

        if exit_code == 0 {
            let guardrail_result = run_guardrails(
                &ctx.guardrails,
                run_id,
                &ctx.cwd,
                &child_env,
                extraction.report_path.as_deref(),
                &output_log_path,
                ctx.guardrail_timeout_secs,
            )
            .await;
            if guardrail_result.ok() {
                extracted = Some(extraction);
                break;
            }

            failure_reason = Some("guardrail_failed".to_string());
            append_text_to_stderr_artifact(
                artifacts,
                run_id,
                &guardrail_failure_text(&guardrail_result.failures),
                &ctx.secrets,
            );
            exit_code = 1;

            if retries_attempted >= ctx.max_retries {
                extracted = Some(extraction);
                break;
            }
            retries_attempted += 1;
            tracing::warn!(
                run_id = %run_id,
                harness_id = %adapter.id(),
                retries_attempted,
                max_retries = ctx.max_retries,
                "retrying after guardrail failure"
            );
            if backoff(ctx.retry_backoff_secs, retries_attempted, &ctx.cancel).await {
                exit_code = 130;
                extracted = Some(extraction);
                break;
            }
            continue;
        }

        let stderr_text = stderr_artifact_text(artifacts, run_id);
        let category = classify_error(exit_code, &stderr_text);
        if category == ErrorCategory::StrategyChange {
            failure_reason = Some("strategy_change".to_string());
        } else if spawn_result.timed_out && failure_reason.is_none() {
            failure_reason = Some("timeout".to_string());
        }

        if !should_retry(exit_code, &stderr_text, retries_attempted, ctx.max_retries) {
            extracted = Some(extraction);
            break;
        }

        retries_attempted += 1;
        tracing::warn!(
            run_id = %run_id,
            harness_id = %adapter.id(),
            exit_code,
            retries_attempted,
            max_retries = ctx.max_retries,
            error_category = %category,
            "retrying failed run attempt"
        );
        if backoff(ctx.retry_backoff_secs, retries_attempted, &ctx.cancel).await {
            exit_code = 130;
            extracted = Some(extraction);
            break;
        }
    }

    Ok(LoopOutcome {
        exit_code,
        failure_reason,
        extracted,
    })
}

/// Test-only launch override: `MERIDIAN_HARNESS_COMMAND` replaces the
/// adapter-built command wholesale (whitespace-split argv).
fn harness_command_override() -> Option<Vec<String>> {
    let raw = std::env::var("MERIDIAN_HARNESS_COMMAND").ok()?;
    let command: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if command.is_empty() {
        return None;
    }
    Some(command)
}

/// Sleep between retries; returns true when the wait was cancelled.
async fn backoff(
    retry_backoff_secs: f64,
    retries_attempted: u32,
    cancel: &CancellationToken,
) -> bool {
    if retry_backoff_secs <= 0.0 {
        return cancel.is_cancelled();
    }
    let delay = retry_backoff_secs * f64::from(retries_attempted);
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs_f64(delay)) => false,
        _ = cancel.cancelled() => true,
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
