//! Store-assigned record identifiers.
//!
//! Each entity kind gets its own newtype so a node id can never be passed
//! where a version id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw integer value as stored.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

record_id!(
    /// Identifier of a [`Version`](super::Version).
    VersionId
);
record_id!(
    /// Identifier of a [`Node`](super::Node).
    NodeId
);
record_id!(
    /// Identifier of an [`Edge`](super::Edge).
    EdgeId
);
record_id!(
    /// Identifier of a [`Tag`](super::Tag).
    TagId
);
