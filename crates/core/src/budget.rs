// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Budget limits and breach metadata

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Budget limits in USD. Either limit may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Budget {
    pub per_run_usd: Option<f64>,
    pub per_workspace_usd: Option<f64>,
}

/// Which limit was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetScope {
    Run,
    Workspace,
}

impl BudgetScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetScope::Run => "run",
            BudgetScope::Workspace => "workspace",
        }
    }
}

impl std::fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observed budget breach metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetBreach {
    pub scope: BudgetScope,
    pub observed_usd: f64,
    pub limit_usd: f64,
}

/// Validate numeric limits and build a [`Budget`].
///
/// Returns `None` when neither limit is set; rejects non-positive limits.
pub fn normalize_budget(
    per_run_usd: Option<f64>,
    per_workspace_usd: Option<f64>,
) -> Result<Option<Budget>, ConfigError> {
    fn validate(name: &'static str, value: Option<f64>) -> Result<Option<f64>, ConfigError> {
        match value {
            None => Ok(None),
            Some(v) if v > 0.0 => Ok(Some(v)),
            Some(_) => Err(ConfigError::InvalidBudget(name)),
        }
    }

    let budget = Budget {
        per_run_usd: validate("per-run budget", per_run_usd)?,
        per_workspace_usd: validate("per-workspace budget", per_workspace_usd)?,
    };
    if budget.per_run_usd.is_none() && budget.per_workspace_usd.is_none() {
        return Ok(None);
    }
    Ok(Some(budget))
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
