//! Result store tests.

use pipeflow::{InMemoryStore, PipelineError, ResultStore};
use serde_json::json;

#[test]
fn test_add_and_get() {
    let store = InMemoryStore::new();
    store.add("a", json!({ "result": 1 }), true).unwrap();
    assert_eq!(store.get("a"), Some(json!({ "result": 1 })));
    assert_eq!(store.get("missing"), None);
}

#[test]
fn test_add_overwrite() {
    let store = InMemoryStore::new();
    store.add("a", json!(1), true).unwrap();
    store.add("a", json!(2), true).unwrap();
    assert_eq!(store.get("a"), Some(json!(2)));
}

#[test]
fn test_add_without_overwrite_rejects_duplicate() {
    let store = InMemoryStore::new();
    store.add("a", json!(1), false).unwrap();
    let err = store.add("a", json!(2), false).unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateResult(_)));
    assert_eq!(store.get("a"), Some(json!(1)));
}

#[test]
fn test_all_snapshots_everything() {
    let store = InMemoryStore::new();
    store.add("a", json!(1), true).unwrap();
    store.add("b", json!(2), true).unwrap();
    let all = store.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all["a"], json!(1));
    assert_eq!(all["b"], json!(2));
}

#[test]
fn test_empty_clears() {
    let store = InMemoryStore::new();
    store.add("a", json!(1), true).unwrap();
    store.empty();
    assert!(store.all().is_empty());
    assert_eq!(store.get("a"), None);
}
