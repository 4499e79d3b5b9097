//! Process-local store backed by plain vectors.
//!
//! Records are append-only, so a transaction rolls back by truncating every
//! record set to the length it had when the transaction began.

use std::cell::RefCell;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::{Store, StoreOps};
use crate::error::{ArborError, ArborResult};
use crate::types::{Edge, EdgeId, Node, NodeId, Payload, Tag, TagId, Version, VersionId};

#[derive(Debug, Default)]
struct MemoryState {
    versions: Vec<Version>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    tags: Vec<Tag>,
}

/// Record counts at the start of a transaction.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    versions: usize,
    nodes: usize,
    edges: usize,
    tags: usize,
}

impl MemoryState {
    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            versions: self.versions.len(),
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            tags: self.tags.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.versions.truncate(checkpoint.versions);
        self.nodes.truncate(checkpoint.nodes);
        self.edges.truncate(checkpoint.edges);
        self.tags.truncate(checkpoint.tags);
    }

    // Ids are 1-based positions; nothing is ever deleted outside a rollback.
    fn next_id(len: usize) -> i64 {
        len as i64 + 1
    }

    fn version(&self, id: VersionId) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn create_version(&mut self, name: &str, parent: Option<VersionId>) -> ArborResult<Version> {
        if let Some(parent_id) = parent {
            if self.version(parent_id).is_none() {
                return Err(ArborError::version_not_found(parent_id));
            }
        }

        let version = Version {
            id: VersionId(Self::next_id(self.versions.len())),
            name: name.to_string(),
            parent_version_id: parent,
            created_at: Utc::now(),
        };
        self.versions.push(version.clone());
        Ok(version)
    }

    fn create_node(&mut self, version_id: VersionId, payload: &Payload) -> ArborResult<Node> {
        if self.version(version_id).is_none() {
            return Err(ArborError::version_not_found(version_id));
        }

        let node = Node {
            id: NodeId(Self::next_id(self.nodes.len())),
            version_id,
            payload: payload.clone(),
            created_at: Utc::now(),
        };
        self.nodes.push(node.clone());
        Ok(node)
    }

    fn create_edge(&mut self, source: NodeId, target: NodeId, payload: &Payload) -> ArborResult<Edge> {
        let source_version = self
            .node(source)
            .map(|n| n.version_id)
            .ok_or_else(|| ArborError::node_not_found(source))?;
        let target_version = self
            .node(target)
            .map(|n| n.version_id)
            .ok_or_else(|| ArborError::node_not_found(target))?;

        if source_version != target_version {
            return Err(ArborError::invalid_reference(format!(
                "edge {} -> {} crosses versions {} and {}",
                source, target, source_version, target_version
            )));
        }

        let edge = Edge {
            id: EdgeId(Self::next_id(self.edges.len())),
            version_id: source_version,
            source_node_id: source,
            target_node_id: target,
            payload: payload.clone(),
            created_at: Utc::now(),
        };
        self.edges.push(edge.clone());
        Ok(edge)
    }

    fn create_tag(
        &mut self,
        version_id: VersionId,
        tag_name: &str,
        description: Option<&str>,
    ) -> ArborResult<Tag> {
        if self.version(version_id).is_none() {
            return Err(ArborError::version_not_found(version_id));
        }
        if self.tags.iter().any(|t| t.tag_name == tag_name) {
            return Err(ArborError::duplicate_tag(tag_name));
        }

        let tag = Tag {
            id: TagId(Self::next_id(self.tags.len())),
            version_id,
            tag_name: tag_name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        self.tags.push(tag.clone());
        Ok(tag)
    }

    fn versions_by_parent(&self, parent: VersionId) -> Vec<Version> {
        self.versions
            .iter()
            .filter(|v| v.parent_version_id == Some(parent))
            .cloned()
            .collect()
    }

    fn nodes_by_version(&self, version_id: VersionId) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|n| n.version_id == version_id)
            .cloned()
            .collect()
    }

    fn edges_by_source(&self, node_id: NodeId) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.source_node_id == node_id)
            .cloned()
            .collect()
    }

    fn edges_by_version(&self, version_id: VersionId) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.version_id == version_id)
            .cloned()
            .collect()
    }

    fn tag_by_name(&self, tag_name: &str) -> Option<Tag> {
        self.tags.iter().find(|t| t.tag_name == tag_name).cloned()
    }

    fn tags_by_version(&self, version_id: VersionId) -> Vec<Tag> {
        self.tags
            .iter()
            .filter(|t| t.version_id == version_id)
            .cloned()
            .collect()
    }
}

/// In-memory store. Reads share a lock; writes and transactions are exclusive.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> ArborResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| ArborError::internal(format!("store lock poisoned: {}", e)))
    }

    fn write(&self) -> ArborResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| ArborError::internal(format!("store lock poisoned: {}", e)))
    }
}

impl StoreOps for MemoryStore {
    fn create_version(&self, name: &str, parent: Option<VersionId>) -> ArborResult<Version> {
        self.write()?.create_version(name, parent)
    }

    fn get_version(&self, id: VersionId) -> ArborResult<Option<Version>> {
        Ok(self.read()?.version(id).cloned())
    }

    fn list_versions_by_parent(&self, parent: VersionId) -> ArborResult<Vec<Version>> {
        Ok(self.read()?.versions_by_parent(parent))
    }

    fn list_versions(&self) -> ArborResult<Vec<Version>> {
        Ok(self.read()?.versions.clone())
    }

    fn create_node(&self, version_id: VersionId, payload: &Payload) -> ArborResult<Node> {
        self.write()?.create_node(version_id, payload)
    }

    fn get_node(&self, id: NodeId) -> ArborResult<Option<Node>> {
        Ok(self.read()?.node(id).cloned())
    }

    fn list_nodes_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Node>> {
        Ok(self.read()?.nodes_by_version(version_id))
    }

    fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        payload: &Payload,
    ) -> ArborResult<Edge> {
        self.write()?.create_edge(source, target, payload)
    }

    fn list_edges_by_source(&self, node_id: NodeId) -> ArborResult<Vec<Edge>> {
        Ok(self.read()?.edges_by_source(node_id))
    }

    fn list_edges_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Edge>> {
        Ok(self.read()?.edges_by_version(version_id))
    }

    fn create_tag(
        &self,
        version_id: VersionId,
        tag_name: &str,
        description: Option<&str>,
    ) -> ArborResult<Tag> {
        self.write()?.create_tag(version_id, tag_name, description)
    }

    fn get_tag_by_name(&self, tag_name: &str) -> ArborResult<Option<Tag>> {
        Ok(self.read()?.tag_by_name(tag_name))
    }

    fn list_tags_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Tag>> {
        Ok(self.read()?.tags_by_version(version_id))
    }
}

/// Transactional view over the exclusively locked state.
struct StateOps<'a>(RefCell<&'a mut MemoryState>);

impl StoreOps for StateOps<'_> {
    fn create_version(&self, name: &str, parent: Option<VersionId>) -> ArborResult<Version> {
        self.0.borrow_mut().create_version(name, parent)
    }

    fn get_version(&self, id: VersionId) -> ArborResult<Option<Version>> {
        Ok(self.0.borrow().version(id).cloned())
    }

    fn list_versions_by_parent(&self, parent: VersionId) -> ArborResult<Vec<Version>> {
        Ok(self.0.borrow().versions_by_parent(parent))
    }

    fn list_versions(&self) -> ArborResult<Vec<Version>> {
        Ok(self.0.borrow().versions.clone())
    }

    fn create_node(&self, version_id: VersionId, payload: &Payload) -> ArborResult<Node> {
        self.0.borrow_mut().create_node(version_id, payload)
    }

    fn get_node(&self, id: NodeId) -> ArborResult<Option<Node>> {
        Ok(self.0.borrow().node(id).cloned())
    }

    fn list_nodes_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Node>> {
        Ok(self.0.borrow().nodes_by_version(version_id))
    }

    fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        payload: &Payload,
    ) -> ArborResult<Edge> {
        self.0.borrow_mut().create_edge(source, target, payload)
    }

    fn list_edges_by_source(&self, node_id: NodeId) -> ArborResult<Vec<Edge>> {
        Ok(self.0.borrow().edges_by_source(node_id))
    }

    fn list_edges_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Edge>> {
        Ok(self.0.borrow().edges_by_version(version_id))
    }

    fn create_tag(
        &self,
        version_id: VersionId,
        tag_name: &str,
        description: Option<&str>,
    ) -> ArborResult<Tag> {
        self.0.borrow_mut().create_tag(version_id, tag_name, description)
    }

    fn get_tag_by_name(&self, tag_name: &str) -> ArborResult<Option<Tag>> {
        Ok(self.0.borrow().tag_by_name(tag_name))
    }

    fn list_tags_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Tag>> {
        Ok(self.0.borrow().tags_by_version(version_id))
    }
}

impl Store for MemoryStore {
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn StoreOps) -> ArborResult<()>,
    ) -> ArborResult<()> {
        let mut state = self.write()?;
        let checkpoint = state.checkpoint();

        let result = {
            let view = StateOps(RefCell::new(&mut *state));
            work(&view)
        };

        if result.is_err() {
            state.restore(checkpoint);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_monotonic_per_kind() {
        let store = MemoryStore::new();
        let v1 = store.create_version("One", None).unwrap();
        let v2 = store.create_version("Two", Some(v1.id)).unwrap();
        let n1 = store.create_node(v1.id, &Payload::new()).unwrap();

        assert_eq!(v1.id, VersionId(1));
        assert_eq!(v2.id, VersionId(2));
        assert_eq!(n1.id, NodeId(1));
    }

    #[test]
    fn test_stored_payload_is_independent_copy() {
        let store = MemoryStore::new();
        let v = store.create_version("Tree", None).unwrap();

        let mut data = crate::types::payload_from_value(json!({"k": "v"})).unwrap();
        let node = store.create_node(v.id, &data).unwrap();
        data.insert("k".to_string(), json!("changed"));

        let fetched = store.get_node(node.id).unwrap().unwrap();
        assert_eq!(fetched.payload["k"], json!("v"));
    }

    #[test]
    fn test_validation_matches_sqlite_rules() {
        let store = MemoryStore::new();
        let v1 = store.create_version("One", None).unwrap();
        let v2 = store.create_version("Two", None).unwrap();
        let a = store.create_node(v1.id, &Payload::new()).unwrap();
        let b = store.create_node(v2.id, &Payload::new()).unwrap();

        assert!(matches!(
            store.create_edge(a.id, b.id, &Payload::new()),
            Err(ArborError::InvalidReference { .. })
        ));
        assert!(matches!(
            store.create_node(VersionId(9), &Payload::new()),
            Err(ArborError::VersionNotFound { .. })
        ));

        store.create_tag(v1.id, "v1.0", None).unwrap();
        assert!(matches!(
            store.create_tag(v2.id, "v1.0", None),
            Err(ArborError::DuplicateTag { .. })
        ));
    }

    #[test]
    fn test_transaction_rollback_truncates() {
        let store = MemoryStore::new();
        let kept = store.create_version("Kept", None).unwrap();

        let result = store.transaction(&mut |tx: &dyn StoreOps| {
            let v = tx.create_version("Doomed", Some(kept.id))?;
            tx.create_node(v.id, &Payload::new())?;
            Err(ArborError::internal("abort"))
        });
        assert!(result.is_err());

        assert_eq!(store.list_versions().unwrap().len(), 1);
        assert!(store.list_versions_by_parent(kept.id).unwrap().is_empty());

        // Ids freed by the rollback are handed out again.
        let next = store.create_version("Next", None).unwrap();
        assert_eq!(next.id, VersionId(2));
    }

    #[test]
    fn test_transaction_reads_own_writes() {
        let store = MemoryStore::new();

        store
            .transaction(&mut |tx: &dyn StoreOps| {
                let v = tx.create_version("Tree", None)?;
                let n = tx.create_node(v.id, &Payload::new())?;
                assert_eq!(tx.get_node(n.id)?.map(|n| n.version_id), Some(v.id));
                Ok(())
            })
            .unwrap();

        assert_eq!(store.list_versions().unwrap().len(), 1);
    }
}
