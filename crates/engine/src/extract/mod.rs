// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-execution extraction pipeline used during run finalization

pub mod files_touched;
pub mod report;

use self::files_touched::extract_files_touched;
use self::report::{extract_or_fallback_report, ExtractedReport, ReportSource};
use crate::error::EngineError;
use mdn_adapters::HarnessAdapter;
use mdn_core::{make_artifact_key, redact_secret_text, ArtifactStore, RunId, SecretSpec, TokenUsage};
use std::path::{Path, PathBuf};

const REPORT_FILENAME: &str = "report.md";
const OUTPUT_FILENAME: &str = "output.jsonl";
const STDERR_FILENAME: &str = "stderr.log";
const TOKENS_FILENAME: &str = "tokens.json";

/// Structured enrichment for one finalize event.
#[derive(Debug, Clone)]
pub struct FinalizeExtraction {
    pub usage: TokenUsage,
    pub session_id: Option<String>,
    pub files_touched: Vec<String>,
    pub report_path: Option<PathBuf>,
    pub report: ExtractedReport,
    pub output_is_empty: bool,
}

/// Clear attempt-scoped artifacts so retries never reuse stale state.
pub fn reset_attempt_artifacts(
    artifacts: &dyn ArtifactStore,
    run_id: &RunId,
    log_dir: &Path,
) -> Result<(), EngineError> {
    for name in [
        OUTPUT_FILENAME,
        STDERR_FILENAME,
        TOKENS_FILENAME,
        REPORT_FILENAME,
    ] {
        artifacts.delete(&make_artifact_key(run_id, name))?;
    }

    let report_path = log_dir.join(REPORT_FILENAME);
    match std::fs::remove_file(&report_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::io(&report_path, e)),
    }
}

fn persist_report(
    artifacts: &dyn ArtifactStore,
    run_id: &RunId,
    log_dir: &Path,
    extracted: &ExtractedReport,
    secrets: &[SecretSpec],
) -> Result<Option<PathBuf>, EngineError> {
    let Some(content) = &extracted.content else {
        return Ok(None);
    };

    let redacted = redact_secret_text(content, secrets);
    let text = if extracted.source == Some(ReportSource::AssistantMessage) {
        format!("# Auto-extracted Report\n\n{}\n", redacted.trim())
    } else {
        redacted
    };

    // Both the filesystem view and the artifact view are populated so
    // downstream readers can consume a single source.
    let target = log_dir.join(REPORT_FILENAME);
    std::fs::create_dir_all(log_dir).map_err(|e| EngineError::io(log_dir, e))?;
    std::fs::write(&target, &text).map_err(|e| EngineError::io(&target, e))?;
    artifacts.put(&make_artifact_key(run_id, REPORT_FILENAME), text.as_bytes())?;
    Ok(Some(target))
}

fn output_is_empty(
    artifacts: &dyn ArtifactStore,
    run_id: &RunId,
    extracted: &ExtractedReport,
) -> bool {
    if let Some(content) = &extracted.content {
        if !content.trim().is_empty() {
            return false;
        }
    }
    let key = make_artifact_key(run_id, OUTPUT_FILENAME);
    if !artifacts.exists(&key) {
        return true;
    }
    match artifacts.get(&key) {
        Ok(raw) => String::from_utf8_lossy(&raw).trim().is_empty(),
        Err(_) => true,
    }
}

/// Run all extraction steps and return one enriched finalization payload.
pub fn enrich_finalize(
    artifacts: &dyn ArtifactStore,
    adapter: &dyn HarnessAdapter,
    run_id: &RunId,
    log_dir: &Path,
    secrets: &[SecretSpec],
) -> Result<FinalizeExtraction, EngineError> {
    let usage = adapter.extract_usage(artifacts, run_id);
    let session_id = adapter.extract_session_id(artifacts, run_id);
    let files_touched = extract_files_touched(artifacts, run_id);
    let report = extract_or_fallback_report(artifacts, run_id);
    let report_path = persist_report(artifacts, run_id, log_dir, &report, secrets)?;
    let empty = output_is_empty(artifacts, run_id, &report);

    Ok(FinalizeExtraction {
        usage,
        session_id,
        files_touched,
        report_path,
        report,
        output_is_empty: empty,
    })
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
