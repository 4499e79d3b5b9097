//! Concurrent forks and tag creation against a shared store.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use arbor_core::{
    payload_from_value, ArborError, MemoryStore, Payload, SqliteStore, Store, VersioningEngine,
};
use serde_json::json;

const THREADS: usize = 8;

fn seeded_engine(store: Arc<dyn Store>) -> VersioningEngine {
    let engine = VersioningEngine::new(store);
    let tree = engine.create_version("Tree").unwrap();
    let mut previous = None;
    for i in 0..20 {
        let node = engine
            .store()
            .create_node(tree.id, &payload_from_value(json!({ "i": i })).unwrap())
            .unwrap();
        if let Some(prev) = previous {
            engine
                .store()
                .create_edge(prev, node.id, &Payload::new())
                .unwrap();
        }
        previous = Some(node.id);
    }
    engine.create_tag(tree.id, "base", None).unwrap();
    engine
}

fn concurrent_forks_are_complete(store: Arc<dyn Store>) {
    let engine = seeded_engine(store.clone());

    let outcomes = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| engine.fork_from_tag("base").unwrap()))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    let version_ids: HashSet<_> = outcomes.iter().map(|o| o.version.id).collect();
    assert_eq!(version_ids.len(), THREADS);

    let mut all_targets = HashSet::new();
    for outcome in &outcomes {
        assert_eq!(store.list_nodes_by_version(outcome.version.id).unwrap().len(), 20);
        assert_eq!(store.list_edges_by_version(outcome.version.id).unwrap().len(), 19);
        for target in outcome.id_map.targets() {
            assert!(all_targets.insert(target), "node {} shared between forks", target);
        }
    }
}

fn concurrent_duplicate_tags_yield_one_winner(store: Arc<dyn Store>) {
    let engine = VersioningEngine::new(store);
    let tree = engine.create_version("Tree").unwrap();

    let results = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| engine.create_tag(tree.id, "race", None)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(ArborError::DuplicateTag { .. })))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(duplicates, THREADS - 1);
}

#[test]
fn test_concurrent_forks_memory() {
    concurrent_forks_are_complete(Arc::new(MemoryStore::new()));
}

#[test]
fn test_concurrent_forks_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(dir.path().join("arbor.db")).unwrap();
    concurrent_forks_are_complete(Arc::new(store));
}

#[test]
fn test_concurrent_duplicate_tags_memory() {
    concurrent_duplicate_tags_yield_one_winner(Arc::new(MemoryStore::new()));
}

#[test]
fn test_concurrent_duplicate_tags_sqlite() {
    concurrent_duplicate_tags_yield_one_winner(Arc::new(SqliteStore::in_memory().unwrap()));
}
