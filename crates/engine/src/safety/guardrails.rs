// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script-based post-run guardrails
//!
//! Guardrails run sequentially after a successful attempt, with the sanitized
//! child environment minus every `MERIDIAN_SECRET_*` entry (the scripts are
//! untrusted repo code). A non-zero exit or a timeout downgrades the run to a
//! retryable failure.

use crate::error::EngineError;
use indexmap::IndexMap;
use mdn_core::RunId;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One failed guardrail execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailFailure {
    pub script: String,
    pub exit_code: i32,
    pub stderr: String,
}

/// Aggregate result for a post-run guardrail pass.
#[derive(Debug, Clone, Default)]
pub struct GuardrailResult {
    pub failures: Vec<GuardrailFailure>,
}

impl GuardrailResult {
    pub fn ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolve and validate guardrail script paths.
///
/// Accepts comma-separated entries; every resolved path must be an existing
/// file.
pub fn normalize_guardrail_paths(
    raw_paths: &[String],
    repo_root: &Path,
) -> Result<Vec<PathBuf>, EngineError> {
    let mut resolved = Vec::new();
    for raw in raw_paths {
        for candidate in raw.split(',') {
            let trimmed = candidate.trim();
            if trimmed.is_empty() {
                continue;
            }
            let path = Path::new(trimmed);
            let absolute = if path.is_absolute() {
                path.to_path_buf()
            } else {
                repo_root.join(path)
            };
            if !absolute.is_file() {
                return Err(EngineError::GuardrailNotFound(absolute));
            }
            resolved.push(absolute);
        }
    }
    Ok(resolved)
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

struct GuardrailEnv<'a> {
    child_env: &'a IndexMap<String, String>,
    run_id: &'a RunId,
    output_log_path: &'a Path,
    report_path: Option<&'a Path>,
}

fn command_for(script: &Path, env: &GuardrailEnv<'_>, cwd: &Path) -> tokio::process::Command {
    let mut command = if is_executable(script) {
        tokio::process::Command::new(script)
    } else {
        let mut bash = tokio::process::Command::new("bash");
        bash.arg(script);
        bash
    };
    command.current_dir(cwd);
    command.env_clear();
    for (key, value) in env.child_env {
        // Guardrails run untrusted repo scripts; never pass secrets through.
        if key.starts_with("MERIDIAN_SECRET_") {
            continue;
        }
        command.env(key, value);
    }
    command.env("MERIDIAN_GUARDRAIL_RUN_ID", env.run_id.as_str());
    command.env("MERIDIAN_GUARDRAIL_OUTPUT_LOG", env.output_log_path);
    if let Some(report_path) = env.report_path {
        command.env("MERIDIAN_GUARDRAIL_REPORT_PATH", report_path);
    }
    command.stdin(std::process::Stdio::null());
    // Reap the child if the timeout drops the wait future.
    command.kill_on_drop(true);
    command
}

/// Execute post-run guardrail scripts and collect failures.
#[allow(clippy::too_many_arguments)]
pub async fn run_guardrails(
    guardrails: &[PathBuf],
    run_id: &RunId,
    cwd: &Path,
    child_env: &IndexMap<String, String>,
    report_path: Option<&Path>,
    output_log_path: &Path,
    timeout_secs: f64,
) -> GuardrailResult {
    if guardrails.is_empty() {
        return GuardrailResult::default();
    }

    let env = GuardrailEnv {
        child_env,
        run_id,
        output_log_path,
        report_path,
    };
    let timeout = Duration::from_secs_f64(timeout_secs.max(0.0));

    let mut failures = Vec::new();
    for script in guardrails {
        match run_one(script, &env, cwd, timeout).await {
            Ok(None) => {}
            Ok(Some(failure)) => failures.push(failure),
            Err(failure) => failures.push(failure),
        }
    }
    GuardrailResult { failures }
}

async fn run_one(
    script: &Path,
    env: &GuardrailEnv<'_>,
    cwd: &Path,
    timeout: Duration,
) -> Result<Option<GuardrailFailure>, GuardrailFailure> {
    let script_name = script.display().to_string();
    let mut command = command_for(script, env, cwd);

    let mut child = command
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|err| GuardrailFailure {
            script: script_name.clone(),
            exit_code: 127,
            stderr: format!("failed to spawn guardrail: {err}"),
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            return Err(GuardrailFailure {
                script: script_name,
                exit_code: 126,
                stderr: format!("guardrail io error: {err}"),
            });
        }
        Err(_) => {
            // Dropping the wait future kills the child (kill_on_drop).
            return Err(GuardrailFailure {
                script: script_name,
                exit_code: 124,
                stderr: format!("guardrail timed out after {:.1}s", timeout.as_secs_f64()),
            });
        }
    };

    if output.status.success() {
        return Ok(None);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(Some(GuardrailFailure {
        script: script_name,
        exit_code: output.status.code().unwrap_or(1),
        stderr: if stderr.is_empty() { stdout } else { stderr },
    }))
}

#[cfg(test)]
#[path = "guardrails_tests.rs"]
mod tests;
