// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness adapter registry

use crate::adapter::HarnessAdapter;
use crate::claude::ClaudeAdapter;
use crate::codex::CodexAdapter;
use crate::error::AdapterError;
use crate::opencode::OpenCodeAdapter;
use mdn_core::HarnessId;

/// Adapter lookup keyed by harness ID.
///
/// Model-family routing is a caller concern; the registry only resolves an
/// explicit harness choice, defaulting to the first registered adapter.
pub struct HarnessRegistry {
    adapters: Vec<Box<dyn HarnessAdapter>>,
}

impl HarnessRegistry {
    /// Registry with the built-in adapters (claude, codex, opencode).
    pub fn builtin() -> Self {
        Self {
            adapters: vec![
                Box::new(ClaudeAdapter),
                Box::new(CodexAdapter),
                Box::new(OpenCodeAdapter),
            ],
        }
    }

    pub fn with_adapters(adapters: Vec<Box<dyn HarnessAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn get(&self, harness_id: &HarnessId) -> Result<&dyn HarnessAdapter, AdapterError> {
        self.adapters
            .iter()
            .map(|adapter| adapter.as_ref())
            .find(|adapter| &adapter.id() == harness_id)
            .ok_or_else(|| AdapterError::UnknownHarness(harness_id.as_str().to_string()))
    }

    /// Default adapter when the caller expresses no preference.
    pub fn default_adapter(&self) -> Option<&dyn HarnessAdapter> {
        self.adapters.first().map(|adapter| adapter.as_ref())
    }

    pub fn ids(&self) -> Vec<HarnessId> {
        self.adapters.iter().map(|adapter| adapter.id()).collect()
    }
}

impl Default for HarnessRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
