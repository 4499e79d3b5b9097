//! Version, node, edge and tag records.
//!
//! Records are created by a [`Store`](crate::store::Store), which assigns ids
//! and timestamps. None of them is mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EdgeId, NodeId, TagId, VersionId};
use crate::error::{ArborError, ArborResult};

/// Opaque node/edge data: an ordered string-keyed map of JSON values.
///
/// Cloning a payload copies the whole value tree.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Convert a JSON value into a payload; only objects (and `null`, as the
/// empty payload) are accepted.
pub fn payload_from_value(value: serde_json::Value) -> ArborResult<Payload> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(Payload::new()),
        other => Err(ArborError::validation(format!(
            "payload must be a JSON object, got {}",
            other
        ))),
    }
}

/// One independent snapshot of a node/edge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Store-assigned identifier.
    pub id: VersionId,
    /// Human-readable name.
    pub name: String,
    /// Version this one was forked from. `None` for a root version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_version_id: Option<VersionId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Version {
    /// Whether this version was created fresh rather than forked.
    pub fn is_root(&self) -> bool {
        self.parent_version_id.is_none()
    }
}

/// A vertex of one version's graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Owning version; nodes are never shared across versions.
    pub version_id: VersionId,
    #[serde(default)]
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

/// A directed edge between two nodes of the same version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Version of both endpoints.
    pub version_id: VersionId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    #[serde(default)]
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Whether the edge points back at its own source.
    pub fn is_self_loop(&self) -> bool {
        self.source_node_id == self.target_node_id
    }
}

/// An immutable, uniquely named pointer to one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    /// Tagged version.
    pub version_id: VersionId,
    /// Unique across all tags.
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_from_object() {
        let payload = payload_from_value(json!({"root": "value", "n": 1})).unwrap();
        assert_eq!(payload.get("root"), Some(&json!("value")));
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_payload_from_null_is_empty() {
        assert!(payload_from_value(serde_json::Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_payload_rejects_scalars() {
        let err = payload_from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ArborError::Validation { .. }));
    }

    #[test]
    fn test_payload_clone_is_deep() {
        let original = payload_from_value(json!({"nested": {"list": [1, 2]}})).unwrap();
        let mut copy = original.clone();
        copy["nested"]["list"]
            .as_array_mut()
            .unwrap()
            .push(json!(3));

        assert_eq!(original["nested"]["list"], json!([1, 2]));
        assert_eq!(copy["nested"]["list"], json!([1, 2, 3]));
    }

    #[test]
    fn test_version_serde_skips_missing_parent() {
        let version = Version {
            id: VersionId(1),
            name: "Demo Tree".to_string(),
            parent_version_id: None,
            created_at: Utc::now(),
        };
        assert!(version.is_root());

        let json = serde_json::to_string(&version).unwrap();
        assert!(!json.contains("parent_version_id"));

        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, version);
    }
}
