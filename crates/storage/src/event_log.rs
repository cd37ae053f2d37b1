// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL event logs
//!
//! One event per line, UTF-8 JSON with keys in sorted order, newline
//! terminated, written in a single `write` call under the log's exclusive
//! lock. Readers take no lock: a torn trailing append simply fails to parse
//! and is skipped on the next read, which is the crash-recovery contract.

use crate::error::StorageError;
use crate::lock::FileLock;
use serde_json::Value;
use std::io::Write;
use std::path::Path;

/// Append one event line under the log's lock.
pub fn append_event(
    log_path: &Path,
    lock_path: &Path,
    payload: &Value,
) -> Result<(), StorageError> {
    let _lock = FileLock::acquire(lock_path)?;
    append_line(log_path, payload)
}

/// Append one event line; the caller must already hold the log's lock.
pub(crate) fn append_line(log_path: &Path, payload: &Value) -> Result<(), StorageError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    // serde_json object maps are BTree-backed, so keys serialize sorted.
    let serialized = serde_json::to_string(payload)?;

    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| StorageError::io(log_path, e))?;

    // A crashed writer may have left a torn line with no terminating newline.
    // Start this event on its own line so the torn bytes stay isolated.
    let needs_newline = ends_without_newline(&file, log_path)?;
    let mut line = String::with_capacity(serialized.len() + 2);
    if needs_newline {
        line.push('\n');
    }
    line.push_str(&serialized);
    line.push('\n');

    // One write call for the whole line to minimize torn appends.
    file.write_all(line.as_bytes())
        .map_err(|e| StorageError::io(log_path, e))?;
    Ok(())
}

fn ends_without_newline(file: &std::fs::File, log_path: &Path) -> Result<bool, StorageError> {
    use std::io::{Read, Seek, SeekFrom};

    let len = file
        .metadata()
        .map_err(|e| StorageError::io(log_path, e))?
        .len();
    if len == 0 {
        return Ok(false);
    }
    let mut tail = [0u8; 1];
    let mut reader = file;
    reader
        .seek(SeekFrom::End(-1))
        .map_err(|e| StorageError::io(log_path, e))?;
    reader
        .read_exact(&mut tail)
        .map_err(|e| StorageError::io(log_path, e))?;
    Ok(tail[0] != b'\n')
}

/// Read all parseable events in file order. Unparseable lines are skipped;
/// the strictly-trailing case is the interrupted-append recovery path.
pub fn read_events(log_path: &Path) -> Result<Vec<Value>, StorageError> {
    let raw = match std::fs::read_to_string(log_path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(log_path, e)),
    };

    let mut rows = Vec::new();
    for line in raw.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(stripped) {
            Ok(Value::Object(map)) => rows.push(Value::Object(map)),
            Ok(_) | Err(_) => continue,
        }
    }
    Ok(rows)
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
