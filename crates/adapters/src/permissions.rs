// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission tier → harness flag translation

use crate::adapter::PermissionResolver;
use crate::error::AdapterError;
use mdn_core::{ConfigError, HarnessId, PermissionConfig, PermissionTier};

const OPENCODE_DANGER_FALLBACK_WARNING: &str =
    "OpenCode has no danger-bypass flag; DANGER falls back to FULL_ACCESS.";

fn claude_allowed_tools(tier: PermissionTier) -> Vec<&'static str> {
    let read_only = vec![
        "Read",
        "Glob",
        "Grep",
        "Bash(git status)",
        "Bash(git log)",
        "Bash(git diff)",
    ];
    if tier == PermissionTier::ReadOnly {
        return read_only;
    }

    let mut workspace_write = read_only;
    workspace_write.extend(["Edit", "Write", "Bash(git add)", "Bash(git commit)"]);
    if tier == PermissionTier::WorkspaceWrite {
        return workspace_write;
    }

    let mut full_access = workspace_write;
    full_access.extend(["WebFetch", "WebSearch", "Bash"]);
    full_access
}

/// Build OpenCode permission JSON from one safety tier.
pub fn opencode_permission_json(tier: PermissionTier) -> String {
    let permissions = match tier {
        PermissionTier::ReadOnly => serde_json::json!({
            "*": "deny",
            "read": "allow",
            "grep": "allow",
            "glob": "allow",
            "list": "allow",
        }),
        PermissionTier::WorkspaceWrite => serde_json::json!({
            "*": "deny",
            "read": "allow",
            "grep": "allow",
            "glob": "allow",
            "list": "allow",
            "edit": "allow",
            "bash": "deny",
        }),
        PermissionTier::FullAccess => serde_json::json!({"*": "allow"}),
        PermissionTier::Danger => {
            tracing::warn!(tier = %tier, "{}", OPENCODE_DANGER_FALLBACK_WARNING);
            serde_json::json!({"*": "allow"})
        }
    };
    permissions.to_string()
}

/// Translate one tier into harness-specific CLI flags.
pub fn permission_flags_for_harness(
    harness_id: &HarnessId,
    config: &PermissionConfig,
) -> Result<Vec<String>, AdapterError> {
    let tier = config.tier;
    if tier == PermissionTier::Danger {
        if !config.allow_unsafe {
            return Err(AdapterError::Config(ConfigError::DangerRequiresUnsafe));
        }
        if harness_id.as_str() == "claude" {
            return Ok(vec!["--dangerously-skip-permissions".to_string()]);
        }
        if harness_id.as_str() == "codex" {
            return Ok(vec![
                "--dangerously-bypass-approvals-and-sandbox".to_string()
            ]);
        }
        // OpenCode has no equivalent global bypass flag.
        return Ok(Vec::new());
    }

    if harness_id.as_str() == "claude" {
        return Ok(vec![
            "--allowedTools".to_string(),
            claude_allowed_tools(tier).join(","),
        ]);
    }

    if harness_id.as_str() == "codex" {
        let sandbox = match tier {
            PermissionTier::ReadOnly => "read-only",
            PermissionTier::WorkspaceWrite => "workspace-write",
            _ => "danger-full-access",
        };
        return Ok(vec!["--sandbox".to_string(), sandbox.to_string()]);
    }

    // OpenCode permissions are applied via env vars, not CLI flags.
    Ok(Vec::new())
}

/// Validate one permission config against harness capability limits.
///
/// Returns a warning string for configurations that are accepted with a
/// weaker effective tier.
pub fn validate_permission_config_for_harness(
    harness_id: &HarnessId,
    config: &PermissionConfig,
) -> Option<String> {
    if harness_id.as_str() == "opencode" && config.tier == PermissionTier::Danger {
        tracing::warn!(
            harness_id = %harness_id,
            requested_tier = %config.tier,
            effective_tier = %PermissionTier::FullAccess,
            "{}",
            OPENCODE_DANGER_FALLBACK_WARNING
        );
        return Some(OPENCODE_DANGER_FALLBACK_WARNING.to_string());
    }
    None
}

/// PermissionResolver backed by one tier config.
#[derive(Debug, Clone, Copy)]
pub struct TieredPermissionResolver {
    config: PermissionConfig,
}

impl TieredPermissionResolver {
    pub fn new(config: PermissionConfig) -> Self {
        Self { config }
    }
}

impl PermissionResolver for TieredPermissionResolver {
    fn resolve_flags(&self, harness_id: &HarnessId) -> Result<Vec<String>, AdapterError> {
        permission_flags_for_harness(harness_id, &self.config)
    }
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;
