// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted fake adapter for exercising the engine with real subprocesses

use crate::adapter::{HarnessAdapter, HarnessCapabilities, PermissionResolver, RunParams};
use crate::common::{
    extract_session_id_from_artifacts, extract_usage_from_artifacts, parse_stream_event,
};
use crate::error::AdapterError;
use mdn_core::{ArtifactStore, EventCategory, HarnessId, RunId, StreamEvent, TokenUsage};

/// Adapter that runs an arbitrary `sh -c` script instead of a vendor CLI.
///
/// Tests drive the full spawn/stream/finalize path with scripts that emit
/// JSONL, sleep, fail, or ignore signals.
#[derive(Debug, Clone)]
pub struct ScriptedAdapter {
    script: String,
    capabilities: HarnessCapabilities,
}

impl ScriptedAdapter {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            capabilities: HarnessCapabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: HarnessCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl HarnessAdapter for ScriptedAdapter {
    fn id(&self) -> HarnessId {
        HarnessId::new("scripted")
    }

    fn capabilities(&self) -> HarnessCapabilities {
        self.capabilities
    }

    fn build_command(
        &self,
        _run: &RunParams,
        perms: &dyn PermissionResolver,
    ) -> Result<Vec<String>, AdapterError> {
        // Permission flags are resolved (so config errors still surface) but
        // not forwarded; the script decides its own behavior.
        let _ = perms.resolve_flags(&self.id())?;
        Ok(vec![
            "sh".to_string(),
            "-c".to_string(),
            self.script.clone(),
        ])
    }

    fn parse_stream_event(&self, line: &str) -> Option<StreamEvent> {
        parse_stream_event(line, &[], EventCategory::System)
    }

    fn extract_usage(&self, artifacts: &dyn ArtifactStore, run_id: &RunId) -> TokenUsage {
        extract_usage_from_artifacts(artifacts, run_id)
    }

    fn extract_session_id(&self, artifacts: &dyn ArtifactStore, run_id: &RunId) -> Option<String> {
        extract_session_id_from_artifacts(artifacts, run_id)
    }
}
