// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn budget(per_run: Option<f64>, per_workspace: Option<f64>) -> Budget {
    Budget {
        per_run_usd: per_run,
        per_workspace_usd: per_workspace,
    }
}

#[test]
fn test_no_limits_never_breach() {
    let mut tracker = LiveBudgetTracker::new(budget(None, None), 0.0);
    assert!(tracker.observe_cost(1_000.0).is_none());
}

#[test]
fn test_per_run_breach() {
    let mut tracker = LiveBudgetTracker::new(budget(Some(0.2), None), 0.0);
    assert!(tracker.observe_cost(0.2).is_none());
    let breach = tracker.observe_cost(0.8).unwrap();
    assert_eq!(breach.scope, BudgetScope::Run);
    assert_eq!(breach.observed_usd, 0.8);
    assert_eq!(breach.limit_usd, 0.2);
}

#[test]
fn test_workspace_breach_includes_prior_spend() {
    let mut tracker = LiveBudgetTracker::new(budget(None, Some(1.0)), 0.9);
    let breach = tracker.observe_cost(0.2).unwrap();
    assert_eq!(breach.scope, BudgetScope::Workspace);
    assert!((breach.observed_usd - 1.1).abs() < 1e-9);
}

#[test]
fn test_run_scope_wins_when_both_breach() {
    let mut tracker = LiveBudgetTracker::new(budget(Some(0.1), Some(0.1)), 0.0);
    let breach = tracker.observe_cost(0.5).unwrap();
    assert_eq!(breach.scope, BudgetScope::Run);
}

#[test]
fn test_run_cost_is_monotone() {
    let mut tracker = LiveBudgetTracker::new(budget(Some(10.0), None), 0.0);
    tracker.observe_cost(0.5);
    tracker.observe_cost(0.3);
    assert_eq!(tracker.run_cost_usd(), 0.5);
    tracker.observe_cost(-1.0);
    assert_eq!(tracker.run_cost_usd(), 0.5);
}

#[parameterized(
    total_cost_usd = { br#"{"total_cost_usd":0.5}"# },
    cost_usd = { br#"{"cost_usd":0.5}"# },
    cost = { br#"{"cost":0.5}"# },
    total_cost = { br#"{"total_cost":0.5}"# },
    camel_case = { br#"{"totalCostUsd":0.5}"# },
    nested = { br#"{"tokens":{"total_cost_usd":0.5}}"# },
    in_array = { br#"{"events":[{"cost":0.5}]}"# },
    string_value = { br#"{"cost":"$0.50"}"# },
)]
fn test_cost_extraction_key_spellings(line: &[u8]) {
    assert_eq!(extract_cost_usd_from_json_line(line), Some(0.5));
}

#[parameterized(
    not_json = { b"plain text" as &[u8] },
    no_cost = { br#"{"role":"assistant"}"# },
    non_numeric = { br#"{"cost":"lots"}"# },
)]
fn test_cost_extraction_misses(line: &[u8]) {
    assert_eq!(extract_cost_usd_from_json_line(line), None);
}

#[test]
fn test_observe_json_line_drives_breach() {
    let mut tracker = LiveBudgetTracker::new(budget(Some(0.2), None), 0.0);
    assert!(tracker
        .observe_json_line(br#"{"tokens":{"total_cost_usd":0.1}}"#)
        .is_none());
    let breach = tracker
        .observe_json_line(br#"{"tokens":{"total_cost_usd":0.8}}"#)
        .unwrap();
    assert_eq!(breach.scope, BudgetScope::Run);
    assert!(tracker.observe_json_line(b"not json").is_none());
}
