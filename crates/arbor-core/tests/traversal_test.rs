//! Integration tests for graph traversal over the SQLite backend.

use arbor_core::{
    payload_from_value, GraphTraversal, NodeId, Payload, SqliteStore, Store, StoreOps,
    TraversalStatus,
};
use serde_json::json;

fn labelled(store: &SqliteStore, version: arbor_core::VersionId, label: &str) -> NodeId {
    store
        .create_node(version, &payload_from_value(json!({ "label": label })).unwrap())
        .unwrap()
        .id
}

#[test]
fn test_cycle_with_branch() {
    let store = SqliteStore::in_memory().unwrap();
    let v = store.create_version("Graph", None).unwrap();
    let a = labelled(&store, v.id, "A");
    let b = labelled(&store, v.id, "B");
    let c = labelled(&store, v.id, "C");
    let d = labelled(&store, v.id, "D");
    for (from, to) in [(a, b), (b, c), (c, a), (b, d), (d, d)] {
        store.create_edge(from, to, &Payload::new()).unwrap();
    }

    let mut traversal = GraphTraversal::new(&store).traverse(v.id, a);
    let mut seen = Vec::new();
    for visit in traversal.by_ref() {
        let visit = visit.unwrap();
        seen.push((visit.node.id, visit.depth));
    }

    assert_eq!(seen, vec![(a, 0), (b, 1), (c, 2), (d, 2)]);
    assert_eq!(traversal.status(), TraversalStatus::Finished);
    assert_eq!(traversal.visited_count(), 4);
}

#[test]
fn test_visit_carries_incoming_edge() {
    let store = SqliteStore::in_memory().unwrap();
    let v = store.create_version("Tree", None).unwrap();
    let root = labelled(&store, v.id, "root");
    let child = labelled(&store, v.id, "child");
    let edge = store
        .create_edge(
            root,
            child,
            &payload_from_value(json!({"relationship": "parent-child"})).unwrap(),
        )
        .unwrap();

    let visits = GraphTraversal::new(&store)
        .traverse(v.id, root)
        .collect_visits()
        .unwrap();

    assert!(visits[0].via.is_none());
    assert_eq!(visits[1].via.as_ref().map(|e| e.id), Some(edge.id));
    assert!(visits[1].to_string().starts_with(&format!("Edge {}:", edge.id)));
}

#[test]
fn test_unreachable_nodes_are_not_visited() {
    let store = SqliteStore::in_memory().unwrap();
    let v = store.create_version("Graph", None).unwrap();
    let a = labelled(&store, v.id, "A");
    let b = labelled(&store, v.id, "B");
    let island = labelled(&store, v.id, "island");
    store.create_edge(a, b, &Payload::new()).unwrap();

    let ids: Vec<NodeId> = GraphTraversal::new(&store)
        .traverse(v.id, a)
        .map(|visit| visit.unwrap().node.id)
        .collect();

    assert_eq!(ids, vec![a, b]);
    assert!(!ids.contains(&island));
}

#[test]
fn test_missing_start_is_not_an_error() {
    let store = SqliteStore::in_memory().unwrap();
    let v = store.create_version("Graph", None).unwrap();

    let mut traversal = GraphTraversal::new(&store).traverse(v.id, NodeId(404));
    assert!(traversal.next().is_none());
    assert_eq!(traversal.status(), TraversalStatus::NodeNotFound(NodeId(404)));
}

#[test]
fn test_traversal_inside_transaction() {
    let store = SqliteStore::in_memory().unwrap();
    let mut count = 0;

    store
        .transaction(&mut |tx: &dyn StoreOps| {
            let v = tx.create_version("Scratch", None)?;
            let a = tx.create_node(v.id, &Payload::new())?;
            let b = tx.create_node(v.id, &Payload::new())?;
            tx.create_edge(a.id, b.id, &Payload::new())?;
            count = GraphTraversal::new(tx).traverse(v.id, a.id).collect_visits()?.len();
            Ok(())
        })
        .unwrap();

    assert_eq!(count, 2);
}
