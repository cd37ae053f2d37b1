// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed session tracking for `.spaces/<space-id>/sessions.jsonl`
//!
//! A session is "active" while some live process holds its
//! `sessions/<chat-id>.lock`. The store owns the lock handles for sessions it
//! started, so the lock lifetime matches the attachment lifetime and the OS
//! reclaims it if the process dies.

use crate::error::StorageError;
use crate::event_log::{append_line, read_events};
use crate::id_gen::next_chat_id;
use crate::lock::FileLock;
use crate::paths::SpacePaths;
use crate::time::utc_now_iso;
use mdn_core::{ChatId, HarnessId, ModelId, SessionEvent, SessionRecord};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Session store for one space directory.
pub struct SessionStore {
    paths: SpacePaths,
    held: Mutex<HashMap<String, FileLock>>,
}

impl SessionStore {
    pub fn new(space_dir: &Path) -> Self {
        Self {
            paths: SpacePaths::from_space_dir(space_dir),
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Append a session start event and acquire the lifetime session lock.
    pub fn start_session(
        &self,
        harness: HarnessId,
        harness_session_id: &str,
        model: ModelId,
        params: Vec<String>,
    ) -> Result<ChatId, StorageError> {
        let _log_lock = FileLock::acquire(&self.paths.sessions_lock)?;
        let chat_id = next_chat_id(&self.paths.space_dir)?;
        let event = SessionEvent::Start {
            v: 1,
            chat_id: chat_id.clone(),
            harness,
            harness_session_id: harness_session_id.to_string(),
            model,
            params,
            started_at: utc_now_iso(),
        };
        append_line(&self.paths.sessions_jsonl, &serde_json::to_value(&event)?)?;

        let session_lock = FileLock::acquire(&self.paths.session_lock(chat_id.as_str()))?;
        self.held
            .lock()
            .insert(chat_id.as_str().to_string(), session_lock);
        Ok(chat_id)
    }

    /// Append a session stop event and release the lifetime session lock.
    pub fn stop_session(&self, chat_id: &ChatId) -> Result<(), StorageError> {
        let event = SessionEvent::Stop {
            v: 1,
            chat_id: chat_id.clone(),
            stopped_at: utc_now_iso(),
        };
        let payload = serde_json::to_value(&event)?;

        let _log_lock = FileLock::acquire(&self.paths.sessions_lock)?;
        append_line(&self.paths.sessions_jsonl, &payload)?;
        self.held.lock().remove(chat_id.as_str());
        Ok(())
    }

    /// Session IDs whose `sessions/<id>.lock` is currently held by a live
    /// process.
    pub fn list_active_sessions(&self) -> Result<Vec<ChatId>, StorageError> {
        let mut active = Vec::new();
        for (chat_id, lock_path) in self.session_lock_files()? {
            match FileLock::try_acquire(&lock_path)? {
                // Acquirable means nobody holds it: not active.
                Some(probe) => drop(probe),
                None => active.push(ChatId::from_string(chat_id)),
            }
        }
        active.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(active)
    }

    /// Most recently started session record.
    pub fn get_last_session(&self) -> Result<Option<SessionRecord>, StorageError> {
        let mut last_chat_id: Option<String> = None;
        for value in read_events(&self.paths.sessions_jsonl)? {
            if let Ok(SessionEvent::Start { chat_id, .. }) =
                serde_json::from_value::<SessionEvent>(value)
            {
                last_chat_id = Some(chat_id.as_str().to_string());
            }
        }
        let Some(chat_id) = last_chat_id else {
            return Ok(None);
        };
        Ok(self.records()?.remove(&chat_id))
    }

    /// Resolve a session reference by chat ID (`cN`) or harness session ID.
    pub fn resolve_session_ref(&self, reference: &str) -> Result<Option<SessionRecord>, StorageError> {
        let normalized = reference.trim();
        if normalized.is_empty() {
            return Ok(None);
        }

        let mut records = self.records()?;
        if let Some(record) = records.remove(normalized) {
            return Ok(Some(record));
        }

        let mut matches: Vec<SessionRecord> = records
            .into_values()
            .filter(|record| record.harness_session_id == normalized)
            .collect();
        matches.sort_by(|a, b| a.chat_id.sort_key().cmp(&b.chat_id.sort_key()));
        Ok(matches.into_iter().next())
    }

    /// Harness session ID for a meridian chat ID.
    pub fn harness_session_id(&self, chat_id: &ChatId) -> Result<Option<String>, StorageError> {
        Ok(self
            .records()?
            .remove(chat_id.as_str())
            .map(|record| record.harness_session_id))
    }

    /// Stop and remove dead session locks left behind by crashed processes.
    ///
    /// A lock that can be acquired non-blocking has no live holder; such
    /// sessions get a synthetic stop event and their lock file is removed.
    pub fn cleanup_stale_sessions(&self) -> Result<Vec<ChatId>, StorageError> {
        let mut stale: Vec<(String, PathBuf, FileLock)> = Vec::new();
        for (chat_id, lock_path) in self.session_lock_files()? {
            if let Some(probe) = FileLock::try_acquire(&lock_path)? {
                stale.push((chat_id, lock_path, probe));
            }
        }
        if stale.is_empty() {
            return Ok(Vec::new());
        }

        let mut cleaned: Vec<ChatId> = stale
            .iter()
            .map(|(chat_id, _, _)| ChatId::from_string(chat_id.clone()))
            .collect();
        cleaned.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let _log_lock = FileLock::acquire(&self.paths.sessions_lock)?;
        let records = self.records()?;
        let stopped_at = utc_now_iso();
        for (chat_id, lock_path, probe) in stale {
            let needs_stop = records
                .get(&chat_id)
                .map(|record| record.stopped_at.is_none())
                .unwrap_or(false);
            if needs_stop {
                let event = SessionEvent::Stop {
                    v: 1,
                    chat_id: ChatId::from_string(chat_id.clone()),
                    stopped_at: stopped_at.clone(),
                };
                append_line(&self.paths.sessions_jsonl, &serde_json::to_value(&event)?)?;
            }
            drop(probe);
            let _ = std::fs::remove_file(&lock_path);
            self.held.lock().remove(&chat_id);
        }
        Ok(cleaned)
    }

    fn session_lock_files(&self) -> Result<Vec<(String, PathBuf)>, StorageError> {
        let entries = match std::fs::read_dir(&self.paths.sessions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.paths.sessions_dir, e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.paths.sessions_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("lock") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            found.push((stem.to_string(), path.clone()));
        }
        Ok(found)
    }

    fn records(&self) -> Result<HashMap<String, SessionRecord>, StorageError> {
        let mut records: HashMap<String, SessionRecord> = HashMap::new();
        for value in read_events(&self.paths.sessions_jsonl)? {
            let Ok(event) = serde_json::from_value::<SessionEvent>(value) else {
                continue;
            };
            match event {
                SessionEvent::Start {
                    chat_id,
                    harness,
                    harness_session_id,
                    model,
                    params,
                    started_at,
                    ..
                } => {
                    records.insert(
                        chat_id.as_str().to_string(),
                        SessionRecord {
                            chat_id,
                            harness,
                            harness_session_id,
                            model,
                            params,
                            started_at,
                            stopped_at: None,
                        },
                    );
                }
                SessionEvent::Stop {
                    chat_id,
                    stopped_at,
                    ..
                } => {
                    if let Some(record) = records.get_mut(chat_id.as_str()) {
                        record.stopped_at = Some(stopped_at);
                    }
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
#[path = "session_log_tests.rs"]
mod tests;
