//! Record storage for versions, nodes, edges and tags.
//!
//! [`StoreOps`] is the CRUD surface the engine and traversal talk to.
//! [`Store`] adds a transactional scope so a multi-record write (a fork)
//! becomes visible all at once or not at all.
//!
//! Two backends are provided:
//!
//! - [`SqliteStore`] - durable, rusqlite-backed
//! - [`MemoryStore`] - process-local, for tests and throwaway sessions

mod factory;
mod memory;
pub mod schema;
mod sqlite;

pub use factory::StoreFactory;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::ArborResult;
use crate::types::{Edge, Node, NodeId, Payload, Tag, Version, VersionId};

/// CRUD and filter operations over the four record kinds.
///
/// Listing operations return records in insertion order. Lookups by id
/// return `Ok(None)` for unknown ids; only genuine storage failures are
/// errors.
pub trait StoreOps {
    /// Create a version. `parent` records lineage for forks.
    fn create_version(&self, name: &str, parent: Option<VersionId>) -> ArborResult<Version>;

    /// Get a version by id.
    fn get_version(&self, id: VersionId) -> ArborResult<Option<Version>>;

    /// Versions whose parent is `parent`.
    fn list_versions_by_parent(&self, parent: VersionId) -> ArborResult<Vec<Version>>;

    /// Every version.
    fn list_versions(&self) -> ArborResult<Vec<Version>>;

    /// Create a node under `version_id`.
    ///
    /// # Errors
    ///
    /// `VersionNotFound` if the version does not exist.
    fn create_node(&self, version_id: VersionId, payload: &Payload) -> ArborResult<Node>;

    /// Get a node by id.
    fn get_node(&self, id: NodeId) -> ArborResult<Option<Node>>;

    /// Nodes belonging to `version_id`.
    fn list_nodes_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Node>>;

    /// Create a directed edge. The edge inherits its endpoints' version.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if either endpoint does not exist
    /// - `InvalidReference` if the endpoints belong to different versions
    fn create_edge(&self, source: NodeId, target: NodeId, payload: &Payload)
        -> ArborResult<Edge>;

    /// Edges leaving `node_id`.
    fn list_edges_by_source(&self, node_id: NodeId) -> ArborResult<Vec<Edge>>;

    /// Edges belonging to `version_id`.
    fn list_edges_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Edge>>;

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// - `DuplicateTag` if `tag_name` is already used
    /// - `VersionNotFound` if the version does not exist
    fn create_tag(
        &self,
        version_id: VersionId,
        tag_name: &str,
        description: Option<&str>,
    ) -> ArborResult<Tag>;

    /// Get a tag by its unique name.
    fn get_tag_by_name(&self, tag_name: &str) -> ArborResult<Option<Tag>>;

    /// Tags pointing at `version_id`.
    fn list_tags_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Tag>>;
}

/// A shareable store with an atomic unit of work.
pub trait Store: StoreOps + Send + Sync {
    /// Run `work` against a transactional view of the store.
    ///
    /// Everything `work` writes through the view is committed when it returns
    /// `Ok` and discarded when it returns `Err`; the error is passed through
    /// unchanged. Transactions are serialized with each other and with reads,
    /// so no caller ever observes a partially applied unit of work.
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn StoreOps) -> ArborResult<()>,
    ) -> ArborResult<()>;
}
