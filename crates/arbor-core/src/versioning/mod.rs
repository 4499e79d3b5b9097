//! Tagging, forking and lineage queries.
//!
//! A tag freezes a version under a unique name. Forking a tag deep-copies the
//! tagged version's nodes and edges into a new version whose parent is the
//! tagged one, returning the old-to-new node id map alongside it.

mod engine;

pub use engine::{ForkOutcome, VersioningEngine};
