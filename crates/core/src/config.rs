// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration loaded from `.meridian/config.toml`

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Terminal output preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Verbosity preset: "quiet", "normal", "verbose", or "debug".
    pub verbosity: String,
    /// Visible stream-event categories when no preset applies.
    pub show: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            verbosity: "normal".to_string(),
            show: vec![
                "lifecycle".to_string(),
                "sub-run".to_string(),
                "error".to_string(),
            ],
        }
    }
}

/// Engine configuration with spec defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeridianConfig {
    pub max_retries: u32,
    pub retry_backoff_secs: f64,
    pub guardrail_timeout_secs: f64,
    pub kill_grace_secs: f64,
    pub output: OutputConfig,
}

impl Default for MeridianConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_secs: 1.0,
            guardrail_timeout_secs: 30.0,
            kill_grace_secs: 5.0,
            output: OutputConfig::default(),
        }
    }
}

impl MeridianConfig {
    /// Load config from a TOML file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(ConfigError::ConfigRead {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        toml::from_str(&raw).map_err(|err| ConfigError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
