//! Core types for arbor.

mod id_map;
mod ids;
mod record;

pub use id_map::IdMap;
pub use ids::{EdgeId, NodeId, TagId, VersionId};
pub use record::{payload_from_value, Edge, Node, Payload, Tag, Version};
