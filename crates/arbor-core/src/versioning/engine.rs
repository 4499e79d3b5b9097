//! Versioning engine.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::VersioningConfig;
use crate::error::{ArborError, ArborResult};
use crate::store::{Store, StoreOps};
use crate::types::{IdMap, Tag, Version, VersionId};

/// Result of forking a tagged version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkOutcome {
    /// The newly created version.
    pub version: Version,
    /// Source node id to copied node id, one entry per source node.
    pub id_map: IdMap,
    /// Number of edges copied.
    pub edges_copied: usize,
}

/// Creates tags, forks versions from tags and answers lineage queries.
///
/// The engine holds an explicit store handle; every multi-record write goes
/// through [`Store::transaction`].
#[derive(Clone)]
pub struct VersioningEngine {
    store: Arc<dyn Store>,
    config: VersioningConfig,
}

impl VersioningEngine {
    /// Create an engine with default configuration.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_config(store, VersioningConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(store: Arc<dyn Store>, config: VersioningConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Create a fresh root version with no nodes.
    pub fn create_version(&self, name: &str) -> ArborResult<Version> {
        self.store.create_version(name, None)
    }

    /// Tag a version.
    ///
    /// # Errors
    ///
    /// - `Validation` if `tag_name` is blank
    /// - `VersionNotFound` if `version_id` does not resolve
    /// - `DuplicateTag` if the name is taken
    pub fn create_tag(
        &self,
        version_id: VersionId,
        tag_name: &str,
        description: Option<&str>,
    ) -> ArborResult<Tag> {
        if tag_name.trim().is_empty() {
            return Err(ArborError::validation("tag name must not be empty"));
        }

        let mut created = None;
        self.store.transaction(&mut |tx: &dyn StoreOps| {
            if tx.get_version(version_id)?.is_none() {
                return Err(ArborError::version_not_found(version_id));
            }
            created = Some(tx.create_tag(version_id, tag_name, description)?);
            Ok(())
        })?;

        let tag = created.ok_or_else(|| ArborError::internal("tag transaction produced no tag"))?;
        tracing::info!("Created tag '{}' for version {}", tag.tag_name, version_id);
        Ok(tag)
    }

    /// Fork a new version from a tagged one.
    ///
    /// Creates a version whose parent is the tagged version, copies every
    /// node, then copies every edge with both endpoints remapped. The whole
    /// copy is one transaction.
    ///
    /// # Errors
    ///
    /// - `TagNotFound` if no tag has this name
    /// - `CopyFailed` if any part of the copy failed; nothing was written
    pub fn fork_from_tag(&self, tag_name: &str) -> ArborResult<ForkOutcome> {
        let tag = self
            .store
            .get_tag_by_name(tag_name)?
            .ok_or_else(|| ArborError::tag_not_found(tag_name))?;
        let source = self
            .store
            .get_version(tag.version_id)?
            .ok_or_else(|| ArborError::version_not_found(tag.version_id))?;

        let name = self.config.fork_name(tag_name);
        let mut outcome = None;
        let result = self.store.transaction(&mut |tx: &dyn StoreOps| {
            outcome = Some(copy_version(tx, &source, &name)?);
            Ok(())
        });

        if let Err(e) = result {
            tracing::warn!("Fork of tag '{}' rolled back: {}", tag_name, e);
            return Err(ArborError::copy_failed(tag_name, e));
        }

        let outcome =
            outcome.ok_or_else(|| ArborError::internal("fork transaction produced no version"))?;
        tracing::info!(
            "Forked version {} from tag '{}' (version {}): {} nodes, {} edges",
            outcome.version.id,
            tag_name,
            source.id,
            outcome.id_map.len(),
            outcome.edges_copied
        );
        Ok(outcome)
    }

    /// The version a tag points at. Never creates anything.
    pub fn get_version_by_tag(&self, tag_name: &str) -> ArborResult<Version> {
        let tag = self
            .store
            .get_tag_by_name(tag_name)?
            .ok_or_else(|| ArborError::tag_not_found(tag_name))?;

        self.store
            .get_version(tag.version_id)?
            .ok_or_else(|| ArborError::version_not_found(tag.version_id))
    }

    /// Versions forked directly from `version_id`, oldest first.
    ///
    /// Unknown ids simply have no children.
    pub fn get_child_versions(&self, version_id: VersionId) -> ArborResult<Vec<Version>> {
        self.store.list_versions_by_parent(version_id)
    }

    /// `version_id` followed by its ancestors, ending at a root version.
    pub fn get_lineage(&self, version_id: VersionId) -> ArborResult<Vec<Version>> {
        let mut current = self
            .store
            .get_version(version_id)?
            .ok_or_else(|| ArborError::version_not_found(version_id))?;

        let mut seen = HashSet::new();
        seen.insert(current.id);
        let mut lineage = Vec::new();

        while let Some(parent_id) = current.parent_version_id {
            if !seen.insert(parent_id) {
                tracing::warn!("Version lineage cycles back to {}", parent_id);
                break;
            }
            let parent = self
                .store
                .get_version(parent_id)?
                .ok_or_else(|| ArborError::version_not_found(parent_id))?;
            lineage.push(std::mem::replace(&mut current, parent));
        }
        lineage.push(current);

        Ok(lineage)
    }

    /// Tags pointing at `version_id`.
    pub fn tags_for_version(&self, version_id: VersionId) -> ArborResult<Vec<Tag>> {
        self.store.list_tags_by_version(version_id)
    }
}

/// Two-pass deep copy of `source` into a new child version.
fn copy_version(tx: &dyn StoreOps, source: &Version, name: &str) -> ArborResult<ForkOutcome> {
    let version = tx.create_version(name, Some(source.id))?;
    let nodes = tx.list_nodes_by_version(source.id)?;

    // Every node must be mapped before any edge is remapped.
    let mut id_map = IdMap::new();
    for node in &nodes {
        let copy = tx.create_node(version.id, &node.payload)?;
        id_map.insert(node.id, copy.id);
    }

    let mut edges_copied = 0;
    for node in &nodes {
        for edge in tx.list_edges_by_source(node.id)? {
            let source_id = id_map.translate(edge.source_node_id)?;
            let target_id = id_map.translate(edge.target_node_id)?;
            tx.create_edge(source_id, target_id, &edge.payload)?;
            edges_copied += 1;
        }
    }

    tracing::debug!(
        "Copied {} nodes and {} edges from version {} into {}",
        id_map.len(),
        edges_copied,
        source.id,
        version.id
    );

    Ok(ForkOutcome {
        version,
        id_map,
        edges_copied,
    })
}
