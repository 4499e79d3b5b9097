//! arbor-core - Core library for arbor.
//!
//! Versioned directed graphs: each version owns a set of nodes and edges.
//! A version can be tagged, and a tag can be forked into a new child version
//! holding a deep copy of the tagged graph with freshly allocated ids.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use arbor_core::{GraphTraversal, MemoryStore, StoreOps, VersioningEngine};
//!
//! let engine = VersioningEngine::new(Arc::new(MemoryStore::new()));
//! let tree = engine.create_version("Tree")?;
//! let root = engine.store().create_node(tree.id, &Default::default())?;
//! engine.create_tag(tree.id, "v1.0", Some("Initial version of the tree"))?;
//!
//! let fork = engine.fork_from_tag("v1.0")?;
//! let copy = fork.id_map.translate(root.id)?;
//! for visit in GraphTraversal::new(engine.store().as_ref()).traverse(fork.version.id, copy) {
//!     println!("{}", visit?);
//! }
//! ```

pub mod config;
pub mod error;
pub mod store;
pub mod traversal;
pub mod types;
pub mod versioning;

// Re-export commonly used types
pub use config::{ArborConfig, StoreConfig, StoreProvider, VersioningConfig};
pub use error::{ArborError, ArborResult, ErrorCode};
pub use store::{MemoryStore, SqliteStore, Store, StoreFactory, StoreOps};
pub use traversal::{GraphTraversal, Traversal, TraversalStatus, Visit};
pub use types::{
    payload_from_value, Edge, EdgeId, IdMap, Node, NodeId, Payload, Tag, TagId, Version,
    VersionId,
};
pub use versioning::{ForkOutcome, VersioningEngine};
