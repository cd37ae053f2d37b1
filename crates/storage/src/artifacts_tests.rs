// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mdn_core::make_artifact_key;
use tempfile::tempdir;
use yare::parameterized;

#[test]
fn test_local_store_round_trip() {
    let dir = tempdir().unwrap();
    let store = LocalStore::new(dir.path());
    let key = make_artifact_key(&RunId::from_number(1), "output.jsonl");

    assert!(!store.exists(&key));
    store.put(&key, b"line\n").unwrap();
    assert!(store.exists(&key));
    assert_eq!(store.get(&key).unwrap(), b"line\n");

    store.delete(&key).unwrap();
    assert!(!store.exists(&key));
    assert!(matches!(store.get(&key), Err(ArtifactError::NotFound(_))));
}

#[test]
fn test_local_store_delete_missing_is_ok() {
    let dir = tempdir().unwrap();
    let store = LocalStore::new(dir.path());
    store
        .delete(&make_artifact_key(&RunId::from_number(1), "tokens.json"))
        .unwrap();
}

#[test]
fn test_local_store_list_is_sorted_and_scoped() {
    let dir = tempdir().unwrap();
    let store = LocalStore::new(dir.path());
    let run = RunId::from_number(1);
    let other = RunId::from_number(2);

    store.put(&make_artifact_key(&run, "stderr.log"), b"").unwrap();
    store.put(&make_artifact_key(&run, "output.jsonl"), b"").unwrap();
    store.put(&make_artifact_key(&other, "output.jsonl"), b"").unwrap();

    let keys: Vec<String> = store
        .list(&run)
        .into_iter()
        .map(|k| k.as_str().to_string())
        .collect();
    assert_eq!(keys, vec!["r1/output.jsonl", "r1/stderr.log"]);
}

#[parameterized(
    parent_escape = { "r1/../secrets" },
    absolute = { "/etc/passwd" },
    empty = { "" },
)]
fn test_unsafe_keys_are_rejected(raw: &str) {
    let dir = tempdir().unwrap();
    let store = LocalStore::new(dir.path());
    let key = ArtifactKey::new(raw);
    assert!(matches!(
        store.put(&key, b"x"),
        Err(ArtifactError::UnsafeKey(_))
    ));
    assert!(!store.exists(&key));

    let memory = InMemoryStore::new();
    assert!(matches!(
        memory.put(&key, b"x"),
        Err(ArtifactError::UnsafeKey(_))
    ));
}

#[test]
fn test_in_memory_store_parity() {
    let store = InMemoryStore::new();
    let key = make_artifact_key(&RunId::from_number(3), "report.md");

    store.put(&key, b"# Report").unwrap();
    assert!(store.exists(&key));
    assert_eq!(store.get(&key).unwrap(), b"# Report");
    assert_eq!(store.list(&RunId::from_number(3)).len(), 1);
    assert!(store.list(&RunId::from_number(4)).is_empty());

    store.delete(&key).unwrap();
    assert!(!store.exists(&key));
}
