// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn store(space: &Path) -> SessionStore {
    SessionStore::new(space)
}

#[test]
fn test_start_session_allocates_chat_ids_and_holds_lock() {
    let space = tempdir().unwrap();
    let sessions = store(space.path());

    let first = sessions
        .start_session(HarnessId::new("claude"), "sess-abc", ModelId::new("sonnet"), vec![])
        .unwrap();
    let second = sessions
        .start_session(HarnessId::new("claude"), "sess-def", ModelId::new("sonnet"), vec![])
        .unwrap();

    assert_eq!(first.as_str(), "c1");
    assert_eq!(second.as_str(), "c2");
    assert_eq!(
        sessions.list_active_sessions().unwrap(),
        vec![first.clone(), second.clone()]
    );
}

#[test]
fn test_stop_session_releases_lock_and_records_stop() {
    let space = tempdir().unwrap();
    let sessions = store(space.path());
    let chat_id = sessions
        .start_session(HarnessId::new("codex"), "sess-1", ModelId::new("gpt"), vec![])
        .unwrap();

    sessions.stop_session(&chat_id).unwrap();

    assert!(sessions.list_active_sessions().unwrap().is_empty());
    let record = sessions.resolve_session_ref("c1").unwrap().unwrap();
    assert!(record.stopped_at.is_some());
}

#[test]
fn test_resolve_session_ref_by_harness_session_id() {
    let space = tempdir().unwrap();
    let sessions = store(space.path());
    sessions
        .start_session(
            HarnessId::new("claude"),
            "harness-xyz",
            ModelId::new("sonnet"),
            vec!["--verbose".to_string()],
        )
        .unwrap();

    let record = sessions.resolve_session_ref("harness-xyz").unwrap().unwrap();
    assert_eq!(record.chat_id.as_str(), "c1");
    assert_eq!(record.params, vec!["--verbose".to_string()]);

    assert!(sessions.resolve_session_ref("missing").unwrap().is_none());
    assert!(sessions.resolve_session_ref("  ").unwrap().is_none());
}

#[test]
fn test_get_last_session() {
    let space = tempdir().unwrap();
    let sessions = store(space.path());
    assert!(sessions.get_last_session().unwrap().is_none());

    sessions
        .start_session(HarnessId::new("claude"), "s1", ModelId::new("m"), vec![])
        .unwrap();
    sessions
        .start_session(HarnessId::new("claude"), "s2", ModelId::new("m"), vec![])
        .unwrap();

    let last = sessions.get_last_session().unwrap().unwrap();
    assert_eq!(last.chat_id.as_str(), "c2");
    assert_eq!(last.harness_session_id, "s2");
}

#[test]
fn test_cleanup_stale_sessions_appends_synthetic_stop() {
    let space = tempdir().unwrap();
    let paths = SpacePaths::from_space_dir(space.path());

    // Session started by a store that has since been dropped (crashed
    // process): its lock file remains but nothing holds it.
    {
        let crashed = store(space.path());
        crashed
            .start_session(HarnessId::new("claude"), "dead", ModelId::new("m"), vec![])
            .unwrap();
    }
    assert!(paths.session_lock("c1").exists());

    let sessions = store(space.path());
    let cleaned = sessions.cleanup_stale_sessions().unwrap();
    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].as_str(), "c1");
    assert!(!paths.session_lock("c1").exists());

    let record = sessions.resolve_session_ref("c1").unwrap().unwrap();
    assert!(record.stopped_at.is_some());

    // Idempotent: nothing left to clean.
    assert!(sessions.cleanup_stale_sessions().unwrap().is_empty());
}

#[test]
fn test_cleanup_leaves_live_sessions_alone() {
    let space = tempdir().unwrap();
    let sessions = store(space.path());
    let chat_id = sessions
        .start_session(HarnessId::new("claude"), "alive", ModelId::new("m"), vec![])
        .unwrap();

    assert!(sessions.cleanup_stale_sessions().unwrap().is_empty());
    assert_eq!(sessions.list_active_sessions().unwrap(), vec![chat_id]);
}

#[test]
fn test_harness_session_id_lookup() {
    let space = tempdir().unwrap();
    let sessions = store(space.path());
    let chat_id = sessions
        .start_session(HarnessId::new("opencode"), "oc-9", ModelId::new("m"), vec![])
        .unwrap();
    assert_eq!(
        sessions.harness_session_id(&chat_id).unwrap().as_deref(),
        Some("oc-9")
    );
    assert_eq!(
        sessions
            .harness_session_id(&ChatId::from_number(99))
            .unwrap(),
        None
    );
}
