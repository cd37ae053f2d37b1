// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared strategy-driven command builder for harness adapters
//!
//! Each adapter declares how every [`RunParams`] field maps onto its CLI:
//! append a flag, rewrite through a transform, or drop the field entirely.
//! Prompt text is placed either right after the base command (FLAG mode,
//! e.g. `claude -p <prompt>`) or after all other args (POSITIONAL mode).

use crate::adapter::{PermissionResolver, RunParams};
use crate::error::AdapterError;
use mdn_core::HarnessId;

/// RunParams fields the strategy table can map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunField {
    Model,
    Agent,
    Skills,
    ContinueSessionId,
    ContinueFork,
}

/// Field value shapes fed to strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Switch(bool),
}

/// Mapping rule for how one field is applied to CLI args.
#[derive(Debug, Clone, Copy)]
pub enum FlagStrategy {
    /// Append `--flag value` (lists join with commas, switches append the
    /// bare flag when true).
    CliFlag(&'static str),
    /// Custom rewrite of the field value into args.
    Transform(fn(&FieldValue, &mut Vec<String>)),
    /// Field intentionally ignored by this harness.
    Drop,
}

/// How prompt text is placed in the harness command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Flag,
    Positional,
}

fn field_value(run: &RunParams, field: RunField) -> Option<FieldValue> {
    match field {
        RunField::Model => Some(FieldValue::Text(run.model.as_str().to_string())),
        RunField::Agent => run.agent.clone().map(FieldValue::Text),
        RunField::Skills => {
            if run.skills.is_empty() {
                None
            } else {
                Some(FieldValue::List(run.skills.clone()))
            }
        }
        RunField::ContinueSessionId => run.continue_session_id.clone().map(FieldValue::Text),
        RunField::ContinueFork => Some(FieldValue::Switch(run.continue_fork)),
    }
}

fn append_cli_flag(args: &mut Vec<String>, flag: &str, value: &FieldValue) {
    match value {
        FieldValue::Text(text) => {
            args.push(flag.to_string());
            args.push(text.clone());
        }
        FieldValue::List(items) => {
            if items.is_empty() {
                return;
            }
            args.push(flag.to_string());
            args.push(items.join(","));
        }
        FieldValue::Switch(true) => args.push(flag.to_string()),
        FieldValue::Switch(false) => {}
    }
}

/// Build one harness command using field strategies.
pub fn build_harness_command(
    base_command: &[&str],
    prompt_mode: PromptMode,
    run: &RunParams,
    strategies: &[(RunField, FlagStrategy)],
    perms: &dyn PermissionResolver,
    harness_id: &HarnessId,
) -> Result<Vec<String>, AdapterError> {
    let mut strategy_args: Vec<String> = Vec::new();
    for (field, strategy) in strategies {
        let Some(value) = field_value(run, *field) else {
            continue;
        };
        match strategy {
            FlagStrategy::CliFlag(flag) => append_cli_flag(&mut strategy_args, flag, &value),
            FlagStrategy::Transform(transform) => transform(&value, &mut strategy_args),
            FlagStrategy::Drop => {}
        }
    }

    let mut command: Vec<String> = base_command.iter().map(|s| s.to_string()).collect();
    if prompt_mode == PromptMode::Flag {
        command.push(run.prompt.clone());
    }
    command.extend(strategy_args);
    command.extend(perms.resolve_flags(harness_id)?);
    command.extend(run.extra_args.iter().cloned());
    if prompt_mode == PromptMode::Positional {
        command.push(run.prompt.clone());
    }
    Ok(command)
}

#[cfg(test)]
#[path = "strategies_tests.rs"]
mod tests;
