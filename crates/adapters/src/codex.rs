// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codex CLI harness adapter

use crate::adapter::{HarnessAdapter, HarnessCapabilities, PermissionResolver, RunParams};
use crate::common::{
    extract_session_id_from_artifacts, extract_usage_from_artifacts, parse_stream_event,
};
use crate::error::AdapterError;
use crate::strategies::{build_harness_command, FlagStrategy, PromptMode, RunField};
use mdn_core::{ArtifactStore, EventCategory, HarnessId, RunId, StreamEvent, TokenUsage};

const STRATEGIES: [(RunField, FlagStrategy); 5] = [
    (RunField::Model, FlagStrategy::CliFlag("--model")),
    (RunField::Agent, FlagStrategy::Drop),
    (RunField::Skills, FlagStrategy::Drop),
    (RunField::ContinueSessionId, FlagStrategy::Drop),
    (RunField::ContinueFork, FlagStrategy::Drop),
];
const EVENT_CATEGORY_MAP: [(&str, EventCategory); 6] = [
    ("response.completed", EventCategory::Lifecycle),
    ("response.output_text.delta", EventCategory::Assistant),
    ("response.reasoning_summary.delta", EventCategory::Thinking),
    ("tool.call.started", EventCategory::ToolUse),
    ("tool.call.completed", EventCategory::ToolUse),
    ("error", EventCategory::Error),
];

/// HarnessAdapter implementation for `codex`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodexAdapter;

impl HarnessAdapter for CodexAdapter {
    fn id(&self) -> HarnessId {
        HarnessId::new("codex")
    }

    fn capabilities(&self) -> HarnessCapabilities {
        HarnessCapabilities {
            supports_stream_events: true,
            supports_session_resume: true,
            supports_session_fork: false,
            supports_native_skills: true,
            supports_programmatic_tools: false,
        }
    }

    fn build_command(
        &self,
        run: &RunParams,
        perms: &dyn PermissionResolver,
    ) -> Result<Vec<String>, AdapterError> {
        // Resume swaps the base command for `codex exec resume <id>`.
        let session_id = run
            .continue_session_id
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        let base: Vec<&str> = if session_id.is_empty() {
            vec!["codex", "exec"]
        } else {
            vec!["codex", "exec", "resume", session_id]
        };
        build_harness_command(
            &base,
            PromptMode::Positional,
            run,
            &STRATEGIES,
            perms,
            &self.id(),
        )
    }

    fn parse_stream_event(&self, line: &str) -> Option<StreamEvent> {
        parse_stream_event(line, &EVENT_CATEGORY_MAP, EventCategory::Progress)
    }

    fn extract_usage(&self, artifacts: &dyn ArtifactStore, run_id: &RunId) -> TokenUsage {
        extract_usage_from_artifacts(artifacts, run_id)
    }

    fn extract_session_id(&self, artifacts: &dyn ArtifactStore, run_id: &RunId) -> Option<String> {
        extract_session_id_from_artifacts(artifacts, run_id)
    }
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
