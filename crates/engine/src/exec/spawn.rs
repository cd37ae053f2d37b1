// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawn-and-stream: one attempt of one run
//!
//! The child runs in its own process group with piped stdout/stderr. Two
//! reader tasks feed raw lines into the driver loop, which owns everything
//! stateful: redaction, the live budget tracker, the tokens.json candidate,
//! stream-event parsing, terminal mirroring, artifact files, signal
//! forwarding, the timeout ladder, and cancellation. Termination is always
//! graceful-then-forceful: a terminal signal (or SIGTERM on timeout/budget
//! breach, SIGINT on cancellation), a kill-grace wait, then SIGKILL on the
//! group.

use crate::error::EngineError;
use crate::exec::signal::{map_raw_exit, signal_process_group, SignalForwarder, TerminalSignal};
use crate::safety::budget::LiveBudgetTracker;
use indexmap::IndexMap;
use mdn_adapters::HarnessAdapter;
use mdn_core::{
    make_artifact_key, redact_secret_bytes, ArtifactStore, BudgetBreach, RunId, SecretSpec,
    StreamObserver,
};
use nix::sys::signal::Signal;
use serde_json::Value;
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const OUTPUT_FILENAME: &str = "output.jsonl";
const STDERR_FILENAME: &str = "stderr.log";
const TOKENS_FILENAME: &str = "tokens.json";

/// Inputs for one spawn attempt.
pub struct SpawnRequest<'a> {
    pub run_id: &'a RunId,
    pub command: &'a [String],
    pub cwd: &'a Path,
    pub env: &'a IndexMap<String, String>,
    pub artifacts: &'a dyn ArtifactStore,
    pub output_log_path: PathBuf,
    pub stderr_log_path: PathBuf,
    pub timeout: Option<Duration>,
    pub kill_grace: Duration,
    pub secrets: &'a [SecretSpec],
    pub adapter: &'a dyn HarnessAdapter,
    pub observer: Option<&'a dyn StreamObserver>,
    pub stream_stdout_to_terminal: bool,
    pub stream_stderr_to_terminal: bool,
    pub cancel: &'a CancellationToken,
}

/// Result from one spawned harness process.
#[derive(Debug, Clone)]
pub struct SpawnResult {
    pub exit_code: i32,
    pub raw_code: Option<i32>,
    pub timed_out: bool,
    pub cancelled: bool,
    pub received_signal: Option<TerminalSignal>,
    pub budget_breach: Option<BudgetBreach>,
}

fn spawn_reader(
    stream: impl tokio::io::AsyncRead + Unpin + Send + 'static,
) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel::<Vec<u8>>(64);
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "stream read failed");
                    break;
                }
            }
        }
    });
    rx
}

struct ArtifactFile {
    file: std::fs::File,
    buffer: Vec<u8>,
}

impl ArtifactFile {
    fn create(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        let file = std::fs::File::create(path).map_err(|e| EngineError::io(path, e))?;
        Ok(Self {
            file,
            buffer: Vec::new(),
        })
    }

    fn append(&mut self, bytes: &[u8]) {
        let _ = self.file.write_all(bytes);
        let _ = self.file.flush();
        self.buffer.extend_from_slice(bytes);
    }
}

fn extract_tokens_payload(raw_line: &[u8]) -> Option<Vec<u8>> {
    let payload: Value = serde_json::from_slice(raw_line).ok()?;
    let tokens = payload.get("tokens")?;
    if !tokens.is_object() {
        return None;
    }
    serde_json::to_vec(tokens).ok()
}

fn mirror_to_terminal(bytes: &[u8]) {
    let mut stderr = std::io::stderr();
    let _ = stderr.write_all(bytes);
    let _ = stderr.flush();
}

/// Spawn one process, stream/capture output, and return mapped exit metadata.
pub async fn spawn_and_stream(
    request: SpawnRequest<'_>,
    mut budget_tracker: Option<&mut LiveBudgetTracker>,
) -> Result<SpawnResult, EngineError> {
    let Some(program) = request.command.first() else {
        return Err(EngineError::EmptyCommand);
    };

    let mut command = tokio::process::Command::new(program);
    command
        .args(&request.command[1..])
        .current_dir(request.cwd)
        .env_clear()
        .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| EngineError::SpawnFailed {
        command: program.clone(),
        source,
    })?;
    let child_pgid = child.id().unwrap_or_default();

    let mut stdout_rx = match child.stdout.take() {
        Some(stdout) => spawn_reader(stdout),
        None => mpsc::channel(1).1,
    };
    let mut stderr_rx = match child.stderr.take() {
        Some(stderr) => spawn_reader(stderr),
        None => mpsc::channel(1).1,
    };

    let mut output_file = ArtifactFile::create(&request.output_log_path)?;
    let mut stderr_file = ArtifactFile::create(&request.stderr_log_path)?;
    let mut tokens_payload: Option<Vec<u8>> = None;

    let mut forwarder =
        SignalForwarder::new(child_pgid).map_err(|e| EngineError::io(Path::new("signal"), e))?;
    let supports_stream_events = request.adapter.capabilities().supports_stream_events;

    let far_future = Instant::now() + Duration::from_secs(86_400 * 365);
    let timeout_at = request.timeout.map(|t| Instant::now() + t);
    let mut kill_at: Option<Instant> = None;
    let mut timed_out = false;
    let mut cancelled = false;
    let mut budget_breach: Option<BudgetBreach> = None;
    let mut exit_status: Option<ExitStatus> = None;
    let mut stdout_open = true;
    let mut stderr_open = true;

    while exit_status.is_none() || stdout_open || stderr_open {
        let timeout_deadline = timeout_at.unwrap_or(far_future);
        let kill_deadline = kill_at.unwrap_or(far_future);
        let child_alive = exit_status.is_none();

        tokio::select! {
            status = child.wait(), if child_alive => {
                match status {
                    Ok(status) => exit_status = Some(status),
                    Err(err) => {
                        tracing::warn!(error = %err, "child wait failed");
                        exit_status = Some(ExitStatus::from_raw(1 << 8));
                    }
                }
            }

            line = stdout_rx.recv(), if stdout_open => {
                match line {
                    None => stdout_open = false,
                    Some(line) => {
                        let redacted = redact_secret_bytes(&line, request.secrets);

                        if budget_breach.is_none() {
                            if let Some(tracker) = budget_tracker.as_deref_mut() {
                                if let Some(breach) = tracker.observe_json_line(&redacted) {
                                    budget_breach = Some(breach);
                                    if child_alive {
                                        // Budget breaches are infra-enforced
                                        // limits; escalate to SIGKILL if the
                                        // child ignores SIGTERM.
                                        signal_process_group(child_pgid, Signal::SIGTERM);
                                        kill_at = Some(Instant::now() + request.kill_grace);
                                    }
                                }
                            }
                        }

                        if let Some(tokens) = extract_tokens_payload(&line) {
                            tokens_payload =
                                Some(redact_secret_bytes(&tokens, request.secrets));
                        }

                        if supports_stream_events {
                            if let Some(observer) = request.observer {
                                let text = String::from_utf8_lossy(&redacted);
                                if let Some(event) = request.adapter.parse_stream_event(&text) {
                                    observer.observe(&event);
                                }
                            }
                        }

                        if request.stream_stdout_to_terminal {
                            mirror_to_terminal(&redacted);
                        }
                        output_file.append(&redacted);
                    }
                }
            }

            line = stderr_rx.recv(), if stderr_open => {
                match line {
                    None => stderr_open = false,
                    Some(line) => {
                        let redacted = redact_secret_bytes(&line, request.secrets);
                        if request.stream_stderr_to_terminal {
                            mirror_to_terminal(&redacted);
                        }
                        stderr_file.append(&redacted);
                    }
                }
            }

            signal = forwarder.next(), if child_alive => {
                forwarder.forward(signal);
            }

            _ = tokio::time::sleep_until(timeout_deadline),
                if timeout_at.is_some() && child_alive && !timed_out => {
                timed_out = true;
                signal_process_group(child_pgid, Signal::SIGTERM);
                kill_at = Some(Instant::now() + request.kill_grace);
            }

            _ = tokio::time::sleep_until(kill_deadline),
                if kill_at.is_some() && child_alive => {
                signal_process_group(child_pgid, Signal::SIGKILL);
                kill_at = None;
            }

            _ = request.cancel.cancelled(), if !cancelled && child_alive => {
                // Caller cancellation mirrors Ctrl-C semantics so children
                // take their graceful SIGINT shutdown paths.
                cancelled = true;
                signal_process_group(child_pgid, Signal::SIGINT);
                kill_at = Some(Instant::now() + request.kill_grace);
            }
        }
    }

    request.artifacts.put(
        &make_artifact_key(request.run_id, OUTPUT_FILENAME),
        &output_file.buffer,
    )?;
    request.artifacts.put(
        &make_artifact_key(request.run_id, STDERR_FILENAME),
        &stderr_file.buffer,
    )?;
    if let Some(tokens) = &tokens_payload {
        request
            .artifacts
            .put(&make_artifact_key(request.run_id, TOKENS_FILENAME), tokens)?;
    }

    let received_signal = forwarder.received_signal();
    let raw_code = exit_status.and_then(|status| status.code());
    let child_signal = exit_status.and_then(|status| status.signal());

    let exit_code = if budget_breach.is_some() {
        2
    } else if timed_out {
        3
    } else {
        map_raw_exit(raw_code, child_signal, received_signal)
    };

    Ok(SpawnResult {
        exit_code,
        raw_code,
        timed_out,
        cancelled,
        received_signal,
        budget_breach,
    })
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
