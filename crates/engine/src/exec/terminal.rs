// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal event filtering and formatting for harness stream output

use mdn_core::{EventCategory, OutputConfig, StreamEvent, StreamObserver};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Mutex;

pub const QUIET_VISIBLE: [EventCategory; 2] = [EventCategory::Lifecycle, EventCategory::Error];
pub const DEFAULT_VISIBLE: [EventCategory; 3] = [
    EventCategory::Lifecycle,
    EventCategory::SubRun,
    EventCategory::Error,
];

/// Terminal-visible categories from CLI verbosity flags and config.
pub fn resolve_visible_categories(
    verbose: bool,
    quiet: bool,
    config: Option<&OutputConfig>,
) -> HashSet<EventCategory> {
    if verbose {
        return EventCategory::ALL.into_iter().collect();
    }
    if quiet {
        return QUIET_VISIBLE.into_iter().collect();
    }
    let Some(config) = config else {
        return DEFAULT_VISIBLE.into_iter().collect();
    };

    match config.verbosity.trim().to_lowercase().as_str() {
        "quiet" => QUIET_VISIBLE.into_iter().collect(),
        "verbose" | "debug" => EventCategory::ALL.into_iter().collect(),
        "normal" => DEFAULT_VISIBLE.into_iter().collect(),
        _ => config
            .show
            .iter()
            .filter_map(|name| EventCategory::parse(name))
            .collect(),
    }
}

/// Emit categorized stream events to a terminal sink.
///
/// Sub-run events get a depth-indented tree prefix relative to this
/// process's own nesting depth.
pub struct TerminalEventFilter {
    visible: HashSet<EventCategory>,
    sink: Mutex<Box<dyn Write + Send>>,
    root_depth: i64,
}

impl TerminalEventFilter {
    pub fn new(visible: HashSet<EventCategory>, root_depth: u32) -> Self {
        Self::with_sink(visible, root_depth, Box::new(std::io::stderr()))
    }

    pub fn with_sink(
        visible: HashSet<EventCategory>,
        root_depth: u32,
        sink: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            visible,
            sink: Mutex::new(sink),
            root_depth: i64::from(root_depth),
        }
    }

    fn format_event(&self, event: &StreamEvent) -> Option<String> {
        let text = normalize_text(event.text.as_deref())
            .or_else(|| normalize_text(Some(&event.raw_line)))
            .unwrap_or_else(|| event.event_type.clone());
        if text.is_empty() {
            return None;
        }
        if event.category == EventCategory::SubRun {
            return Some(format!("{}{}", self.subrun_prefix(event), text));
        }
        Some(text)
    }

    fn subrun_prefix(&self, event: &StreamEvent) -> String {
        let event_depth = event
            .metadata_int("depth")
            .or_else(|| event.metadata_int("d"))
            .unwrap_or(self.root_depth + 1);
        let relative_depth = (event_depth - self.root_depth).max(1);
        format!("{}├─ ", "  ".repeat((relative_depth - 1) as usize))
    }
}

impl StreamObserver for TerminalEventFilter {
    fn observe(&self, event: &StreamEvent) {
        if !self.visible.contains(&event.category) {
            return;
        }
        let Some(rendered) = self.format_event(event) else {
            return;
        };
        if let Ok(mut sink) = self.sink.lock() {
            let _ = writeln!(sink, "{rendered}");
            let _ = sink.flush();
        }
    }
}

fn normalize_text(value: Option<&str>) -> Option<String> {
    let compact = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.is_empty() {
        None
    } else {
        Some(compact)
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
