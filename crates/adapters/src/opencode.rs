// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenCode CLI harness adapter

use crate::adapter::{HarnessAdapter, HarnessCapabilities, PermissionResolver, RunParams};
use crate::common::{
    extract_session_id_from_artifacts, extract_usage_from_artifacts, parse_stream_event,
};
use crate::error::AdapterError;
use crate::permissions::opencode_permission_json;
use crate::strategies::{build_harness_command, FieldValue, FlagStrategy, PromptMode, RunField};
use mdn_core::{
    ArtifactStore, EventCategory, HarnessId, PermissionConfig, RunId, StreamEvent, TokenUsage,
};

fn strip_opencode_prefix(model: &str) -> &str {
    model.strip_prefix("opencode-").unwrap_or(model)
}

fn opencode_model_transform(value: &FieldValue, args: &mut Vec<String>) {
    if let FieldValue::Text(model) = value {
        args.push("--model".to_string());
        args.push(strip_opencode_prefix(model).to_string());
    }
}

const BASE_COMMAND: [&str; 2] = ["opencode", "run"];
const STRATEGIES: [(RunField, FlagStrategy); 3] = [
    (RunField::Model, FlagStrategy::Transform(opencode_model_transform)),
    (RunField::Agent, FlagStrategy::Drop),
    (RunField::Skills, FlagStrategy::Drop),
];
const EVENT_CATEGORY_MAP: [(&str, EventCategory); 6] = [
    ("run.start", EventCategory::SubRun),
    ("run.done", EventCategory::SubRun),
    ("tool.call", EventCategory::ToolUse),
    ("assistant", EventCategory::Assistant),
    ("thinking", EventCategory::Thinking),
    ("error", EventCategory::Error),
];

/// HarnessAdapter implementation for `opencode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCodeAdapter;

impl HarnessAdapter for OpenCodeAdapter {
    fn id(&self) -> HarnessId {
        HarnessId::new("opencode")
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
        build_harness_command(
            &BASE_COMMAND,
            PromptMode::Positional,
            run,
            &STRATEGIES,
            perms,
            &self.id(),
        )
    }

    fn env_overrides(&self, config: &PermissionConfig) -> Vec<(String, String)> {
        vec![(
            "OPENCODE_PERMISSION".to_string(),
            opencode_permission_json(config.tier),
        )]
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
#[path = "opencode_tests.rs"]
mod tests;
