// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphan and stale-state recovery specs

use crate::prelude::*;
use mdn_core::{HarnessId, SpaceStatus};
use mdn_storage::SessionStore;
use serial_test::serial;

#[test]
#[serial]
fn spec_session_lifecycle_and_stale_cleanup() {
    let space = SpecSpace::new();

    // A crashed attachment: the store that held the lock is gone.
    {
        let crashed = SessionStore::new(&space.space_dir);
        crashed
            .start_session(HarnessId::new("claude"), "sess-dead", ModelId::new("m"), vec![])
            .expect("start");
    }

    let sessions = SessionStore::new(&space.space_dir);
    let live_chat = sessions
        .start_session(HarnessId::new("claude"), "sess-live", ModelId::new("m"), vec![])
        .expect("start");

    // Only the live session shows as active; cleanup stops the dead one.
    let cleaned = sessions.cleanup_stale_sessions().expect("cleanup");
    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].as_str(), "c1");
    assert_eq!(sessions.list_active_sessions().expect("active"), vec![live_chat.clone()]);

    let dead = sessions
        .resolve_session_ref("sess-dead")
        .expect("resolve")
        .expect("record");
    assert!(dead.stopped_at.is_some());
    let live = sessions
        .resolve_session_ref(live_chat.as_str())
        .expect("resolve")
        .expect("record");
    assert!(live.stopped_at.is_none());

    sessions.stop_session(&live_chat).expect("stop");
    assert!(sessions.list_active_sessions().expect("active").is_empty());
}

#[test]
#[serial]
fn spec_orphaned_space_lock_closes_space() {
    let space = SpecSpace::new();
    let record = mdn_storage::create_space(space.repo.path(), None).expect("create");

    mdn_engine::write_space_lock(
        space.repo.path(),
        &record.id,
        &["claude".to_string()],
        Some(999_999_999),
    )
    .expect("lease");

    let orphaned = mdn_engine::cleanup_orphaned_locks(space.repo.path()).expect("cleanup");
    assert_eq!(orphaned, vec![record.id.clone()]);

    let reloaded = mdn_storage::get_space(space.repo.path(), &record.id).expect("space");
    assert_eq!(reloaded.status, SpaceStatus::Closed);
    assert!(!mdn_engine::space_lock_path(space.repo.path(), &record.id).exists());
}

#[test]
#[serial]
fn spec_live_lease_survives_cleanup() {
    let space = SpecSpace::new();
    let record = mdn_storage::create_space(space.repo.path(), None).expect("create");
    mdn_engine::write_space_lock(
        space.repo.path(),
        &record.id,
        &["claude".to_string()],
        Some(std::process::id()),
    )
    .expect("lease");

    assert!(mdn_engine::cleanup_orphaned_locks(space.repo.path())
        .expect("cleanup")
        .is_empty());
    assert_eq!(
        mdn_storage::get_space(space.repo.path(), &record.id)
            .expect("space")
            .status,
        SpaceStatus::Active
    );

    mdn_engine::remove_space_lock(space.repo.path(), &record.id);
}

#[tokio::test]
#[serial]
async fn spec_artifacts_are_attempt_scoped_across_retries() {
    let space = SpecSpace::new();
    let mut ctx = space.context();
    ctx.max_retries = 1;

    let marker = space.repo.path().join("attempted");
    let script = format!(
        r#"if [ -f {marker} ]; then echo '{{"role":"assistant","content":"clean"}}'; else touch {marker}; echo stale-first-attempt; echo 'rate limit' >&2; exit 1; fi"#,
        marker = marker.display()
    );

    let outcome = space.run_script(&script, &ctx).await;
    assert_eq!(outcome.exit_code, 0);

    // Attempt two's artifacts contain only attempt two's bytes.
    let output = space.artifact_text(&outcome.run_id, "output.jsonl");
    assert!(output.contains("clean"));
    assert!(!output.contains("stale-first-attempt"));
    let stderr = space.artifact_text(&outcome.run_id, "stderr.log");
    assert!(!stderr.contains("rate limit"));
}
