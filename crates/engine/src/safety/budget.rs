// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live budget tracking fed by harness stdout
//!
//! The tracker watches every stdout line for a recognized cost field and
//! raises a breach as soon as a limit is crossed, so the engine can terminate
//! the child before it finishes. Run cost is monotone: a harness re-reporting
//! a lower number never moves the breach point backwards.

use mdn_adapters::common::{coerce_f64, COST_KEYS};
use mdn_core::{Budget, BudgetBreach, BudgetScope};
use serde_json::Value;

/// Streaming budget tracker for one run.
#[derive(Debug, Clone)]
pub struct LiveBudgetTracker {
    budget: Budget,
    workspace_spent_usd: f64,
    run_cost_usd: f64,
}

impl LiveBudgetTracker {
    pub fn new(budget: Budget, workspace_spent_usd: f64) -> Self {
        Self {
            budget,
            workspace_spent_usd,
            run_cost_usd: 0.0,
        }
    }

    pub fn run_cost_usd(&self) -> f64 {
        self.run_cost_usd
    }

    /// Update the current run cost and return breach details when exceeded.
    pub fn observe_cost(&mut self, cost_usd: f64) -> Option<BudgetBreach> {
        if cost_usd < 0.0 {
            return None;
        }
        if cost_usd > self.run_cost_usd {
            self.run_cost_usd = cost_usd;
        }
        self.check()
    }

    /// Parse one JSONL output line and update if a cost field is present.
    pub fn observe_json_line(&mut self, raw_line: &[u8]) -> Option<BudgetBreach> {
        let cost = extract_cost_usd_from_json_line(raw_line)?;
        self.observe_cost(cost)
    }

    /// Evaluate per-run and per-workspace limits; run scope wins ties.
    pub fn check(&self) -> Option<BudgetBreach> {
        if let Some(per_run) = self.budget.per_run_usd {
            if self.run_cost_usd > per_run {
                return Some(BudgetBreach {
                    scope: BudgetScope::Run,
                    observed_usd: self.run_cost_usd,
                    limit_usd: per_run,
                });
            }
        }
        if let Some(per_workspace) = self.budget.per_workspace_usd {
            let observed = self.workspace_spent_usd + self.run_cost_usd;
            if observed > per_workspace {
                return Some(BudgetBreach {
                    scope: BudgetScope::Workspace,
                    observed_usd: observed,
                    limit_usd: per_workspace,
                });
            }
        }
        None
    }
}

fn find_cost(value: &Value) -> Option<f64> {
    match value {
        Value::Object(map) => {
            for key in COST_KEYS {
                if let Some(cost) = map.get(key).and_then(coerce_f64) {
                    return Some(cost);
                }
            }
            map.values().find_map(find_cost)
        }
        Value::Array(items) => items.iter().find_map(find_cost),
        _ => None,
    }
}

/// Extract the first recognized cost field from one JSON line payload.
pub fn extract_cost_usd_from_json_line(raw_line: &[u8]) -> Option<f64> {
    let payload: Value = serde_json::from_slice(raw_line).ok()?;
    find_cost(&payload)
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
