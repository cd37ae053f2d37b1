// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission tiers applied to harness command construction

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Safety tiers, in escalating order of privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionTier {
    #[serde(rename = "read-only")]
    ReadOnly,
    #[serde(rename = "workspace-write")]
    WorkspaceWrite,
    #[serde(rename = "full-access")]
    FullAccess,
    #[serde(rename = "danger")]
    Danger,
}

impl PermissionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionTier::ReadOnly => "read-only",
            PermissionTier::WorkspaceWrite => "workspace-write",
            PermissionTier::FullAccess => "full-access",
            PermissionTier::Danger => "danger",
        }
    }

    pub const ALL: [PermissionTier; 4] = [
        PermissionTier::ReadOnly,
        PermissionTier::WorkspaceWrite,
        PermissionTier::FullAccess,
        PermissionTier::Danger,
    ];
}

impl std::fmt::Display for PermissionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PermissionTier {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        PermissionTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnsupportedTier(raw.to_string()))
    }
}

/// Resolved permission configuration for one run.
///
/// Invariant: `tier == Danger` requires `allow_unsafe == true`; enforced by
/// [`build_permission_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionConfig {
    pub tier: PermissionTier,
    pub allow_unsafe: bool,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            tier: PermissionTier::ReadOnly,
            allow_unsafe: false,
        }
    }
}

/// Parse one permission tier string, falling back to `default_tier` for
/// missing or empty input.
pub fn parse_permission_tier(
    raw: Option<&str>,
    default_tier: PermissionTier,
) -> Result<PermissionTier, ConfigError> {
    match raw {
        None => Ok(default_tier),
        Some(value) if value.trim().is_empty() => Ok(default_tier),
        Some(value) => value.parse(),
    }
}

/// Build and validate a permission configuration.
pub fn build_permission_config(
    tier: Option<&str>,
    allow_unsafe: bool,
    default_tier: PermissionTier,
) -> Result<PermissionConfig, ConfigError> {
    let resolved = PermissionConfig {
        tier: parse_permission_tier(tier, default_tier)?,
        allow_unsafe,
    };
    if resolved.tier == PermissionTier::Danger && !resolved.allow_unsafe {
        return Err(ConfigError::DangerRequiresUnsafe);
    }
    Ok(resolved)
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;
