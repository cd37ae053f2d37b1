// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-touch extraction from harness output artifacts
//!
//! Union of explicit `files_touched.json` / `files_touched.txt` artifacts and
//! path-shaped strings found in `output.jsonl` and `report.md`, deduped in
//! first-seen order.

use indexmap::IndexSet;
use mdn_core::{make_artifact_key, ArtifactStore, RunId};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const PATH_KEYS: [&str; 6] = ["path", "file", "file_path", "filepath", "source", "target"];
const FILE_LIST_KEYS: [&str; 5] = [
    "files",
    "files_touched",
    "touched_files",
    "modified_files",
    "paths",
];

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Compile-time constant pattern.
        #[allow(clippy::unwrap_used)]
        let pattern =
            Regex::new(r"(?:[A-Za-z]:\\)?(?:\.{1,2}/)?(?:[\w.-]+[\\/])+[\w.-]+(?:\.[\w.-]+)?")
                .unwrap();
        pattern
    })
}

fn boundary_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '/' || c == '.' || c == '-'
}

fn paths_in_text(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for mat in path_pattern().find_iter(text) {
        // Matches glued to a preceding word/path char are mid-token noise.
        let preceded = text[..mat.start()].chars().next_back();
        if preceded.map(boundary_char).unwrap_or(false) {
            continue;
        }
        found.push(mat.as_str().to_string());
    }
    found
}

fn normalize_path(value: &str) -> Option<String> {
    let candidate = value
        .trim()
        .trim_matches(|c: char| "`'\"()[]{}<>.,:;".contains(c));
    if candidate.is_empty() || candidate.contains("://") {
        return None;
    }
    let mut normalized = candidate.replace('\\', "/");
    if let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    if !normalized.contains('/') {
        return None;
    }
    Some(normalized)
}

fn push_path(found: &mut IndexSet<String>, candidate: &str) {
    if let Some(normalized) = normalize_path(candidate) {
        found.insert(normalized);
    }
}

fn extract_from_json_value(value: &Value, found: &mut IndexSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let key_lower = key.to_lowercase();
                if PATH_KEYS.contains(&key_lower.as_str()) {
                    if let Some(path) = nested.as_str() {
                        push_path(found, path);
                        continue;
                    }
                }
                if FILE_LIST_KEYS.contains(&key_lower.as_str()) {
                    if let Value::Array(items) = nested {
                        for item in items {
                            match item.as_str() {
                                Some(path) => push_path(found, path),
                                None => extract_from_json_value(item, found),
                            }
                        }
                        continue;
                    }
                }
                match nested.as_str() {
                    Some(text) => {
                        for candidate in paths_in_text(text) {
                            push_path(found, &candidate);
                        }
                    }
                    None => extract_from_json_value(nested, found),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                extract_from_json_value(item, found);
            }
        }
        Value::String(text) => {
            for candidate in paths_in_text(text) {
                push_path(found, &candidate);
            }
        }
        _ => {}
    }
}

fn read_artifact_text(artifacts: &dyn ArtifactStore, run_id: &RunId, name: &str) -> String {
    let key = make_artifact_key(run_id, name);
    if !artifacts.exists(&key) {
        return String::new();
    }
    match artifacts.get(&key) {
        Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
        Err(_) => String::new(),
    }
}

/// Extract touched file paths from explicit and inferred artifact content.
pub fn extract_files_touched(artifacts: &dyn ArtifactStore, run_id: &RunId) -> Vec<String> {
    let mut found = IndexSet::new();

    let explicit_json = read_artifact_text(artifacts, run_id, "files_touched.json");
    if let Ok(payload) = serde_json::from_str::<Value>(explicit_json.trim()) {
        extract_from_json_value(&payload, &mut found);
    }

    let explicit_text = read_artifact_text(artifacts, run_id, "files_touched.txt");
    for line in explicit_text.lines() {
        push_path(&mut found, line);
    }

    let output_lines = read_artifact_text(artifacts, run_id, "output.jsonl");
    for line in output_lines.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(stripped) {
            Ok(payload) => extract_from_json_value(&payload, &mut found),
            Err(_) => {
                for candidate in paths_in_text(stripped) {
                    push_path(&mut found, &candidate);
                }
            }
        }
    }

    let report = read_artifact_text(artifacts, run_id, "report.md");
    for candidate in paths_in_text(&report) {
        push_path(&mut found, &candidate);
    }

    found.into_iter().collect()
}

#[cfg(test)]
#[path = "files_touched_tests.rs"]
mod tests;
