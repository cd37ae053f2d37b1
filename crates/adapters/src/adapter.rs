// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness adapter trait and shared data models

use crate::error::AdapterError;
use mdn_core::{ArtifactStore, HarnessId, ModelId, PermissionConfig, RunId, StreamEvent, TokenUsage};

/// Feature flags for one harness implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessCapabilities {
    pub supports_stream_events: bool,
    pub supports_session_resume: bool,
    pub supports_session_fork: bool,
    pub supports_native_skills: bool,
    pub supports_programmatic_tools: bool,
}

impl Default for HarnessCapabilities {
    fn default() -> Self {
        Self {
            supports_stream_events: true,
            supports_session_resume: false,
            supports_session_fork: false,
            supports_native_skills: false,
            supports_programmatic_tools: false,
        }
    }
}

/// Inputs required to launch one harness run.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub prompt: String,
    pub model: ModelId,
    pub skills: Vec<String>,
    pub agent: Option<String>,
    pub extra_args: Vec<String>,
    pub continue_session_id: Option<String>,
    pub continue_fork: bool,
}

/// Permission resolver provided by the execution layer.
pub trait PermissionResolver: Send + Sync {
    fn resolve_flags(&self, harness_id: &HarnessId) -> Result<Vec<String>, AdapterError>;
}

/// Safe default resolver: no extra flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeDefaultResolver;

impl PermissionResolver for SafeDefaultResolver {
    fn resolve_flags(&self, _harness_id: &HarnessId) -> Result<Vec<String>, AdapterError> {
        Ok(Vec::new())
    }
}

/// Per-harness launch/parsing/extraction behavior.
pub trait HarnessAdapter: Send + Sync {
    fn id(&self) -> HarnessId;

    fn capabilities(&self) -> HarnessCapabilities;

    /// Build the full command (argv) for one run.
    fn build_command(
        &self,
        run: &RunParams,
        perms: &dyn PermissionResolver,
    ) -> Result<Vec<String>, AdapterError>;

    /// Harness-specific child env additions (e.g. permission JSON).
    fn env_overrides(&self, _config: &PermissionConfig) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Parse one stdout line into a categorized stream event.
    fn parse_stream_event(&self, line: &str) -> Option<StreamEvent>;

    /// Extract token usage from captured run artifacts.
    fn extract_usage(&self, artifacts: &dyn ArtifactStore, run_id: &RunId) -> TokenUsage;

    /// Extract the harness-native session ID from captured run artifacts.
    fn extract_session_id(&self, artifacts: &dyn ArtifactStore, run_id: &RunId) -> Option<String>;
}

impl std::fmt::Debug for dyn HarnessAdapter + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HarnessAdapter").field(&self.id()).finish()
    }
}
