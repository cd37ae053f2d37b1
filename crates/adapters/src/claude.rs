// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude CLI harness adapter

use crate::adapter::{HarnessAdapter, HarnessCapabilities, PermissionResolver, RunParams};
use crate::common::{
    extract_session_id_from_artifacts, extract_usage_from_artifacts, parse_stream_event,
};
use crate::error::AdapterError;
use crate::strategies::{build_harness_command, FlagStrategy, PromptMode, RunField};
use mdn_core::{ArtifactStore, EventCategory, HarnessId, RunId, StreamEvent, TokenUsage};

const BASE_COMMAND: [&str; 2] = ["claude", "-p"];
const STRATEGIES: [(RunField, FlagStrategy); 5] = [
    (RunField::Model, FlagStrategy::CliFlag("--model")),
    (RunField::Agent, FlagStrategy::Drop),
    (RunField::Skills, FlagStrategy::Drop),
    (RunField::ContinueSessionId, FlagStrategy::Drop),
    (RunField::ContinueFork, FlagStrategy::Drop),
];
const EVENT_CATEGORY_MAP: [(&str, EventCategory); 5] = [
    ("result", EventCategory::Lifecycle),
    ("tool_use", EventCategory::ToolUse),
    ("assistant", EventCategory::Assistant),
    ("thinking", EventCategory::Thinking),
    ("error", EventCategory::Error),
];

/// HarnessAdapter implementation for `claude`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeAdapter;

impl HarnessAdapter for ClaudeAdapter {
    fn id(&self) -> HarnessId {
        HarnessId::new("claude")
    }

    fn capabilities(&self) -> HarnessCapabilities {
        HarnessCapabilities {
            supports_stream_events: true,
            supports_session_resume: true,
            supports_session_fork: true,
            supports_native_skills: true,
            supports_programmatic_tools: false,
        }
    }

    fn build_command(
        &self,
        run: &RunParams,
        perms: &dyn PermissionResolver,
    ) -> Result<Vec<String>, AdapterError> {
        let mut command = build_harness_command(
            &BASE_COMMAND,
            PromptMode::Flag,
            run,
            &STRATEGIES,
            perms,
            &self.id(),
        )?;

        // Session resumption appends rather than swapping the base command.
        let session_id = run
            .continue_session_id
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if !session_id.is_empty() {
            command.push("--resume".to_string());
            command.push(session_id.to_string());
            if run.continue_fork {
                command.push("--fork-session".to_string());
            }
        }
        Ok(command)
    }

    fn parse_stream_event(&self, line: &str) -> Option<StreamEvent> {
        parse_stream_event(line, &EVENT_CATEGORY_MAP, EventCategory::System)
    }

    fn extract_usage(&self, artifacts: &dyn ArtifactStore, run_id: &RunId) -> TokenUsage {
        extract_usage_from_artifacts(artifacts, run_id)
    }

    fn extract_session_id(&self, artifacts: &dyn ArtifactStore, run_id: &RunId) -> Option<String> {
        extract_session_id_from_artifacts(artifacts, run_id)
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
