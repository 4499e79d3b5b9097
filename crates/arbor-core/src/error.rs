//! Error types for arbor operations.
//!
//! Every failure carries a structured [`ErrorCode`] so callers can branch on
//! the kind of failure without matching message text.

use thiserror::Error;

use crate::types::{NodeId, VersionId};

/// Result type alias for arbor operations.
pub type ArborResult<T> = Result<T, ArborError>;

/// Main error type for all arbor operations.
#[derive(Error, Debug)]
pub enum ArborError {
    /// Version id does not resolve.
    #[error("Version not found: {version_id}")]
    VersionNotFound {
        version_id: VersionId,
        code: ErrorCode,
    },

    /// Node id does not resolve (or belongs to another version).
    #[error("Node not found: {node_id}")]
    NodeNotFound { node_id: NodeId, code: ErrorCode },

    /// No tag with this name.
    #[error("Tag not found: '{tag_name}'")]
    TagNotFound { tag_name: String, code: ErrorCode },

    /// Tag names are unique across all versions.
    #[error("Tag already exists: '{tag_name}'")]
    DuplicateTag { tag_name: String, code: ErrorCode },

    /// A fork could not be completed; nothing was written.
    #[error("Copy failed: {message}")]
    CopyFailed {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Edge endpoints do not belong to the same version.
    #[error("Invalid reference: {message}")]
    InvalidReference { message: String, code: ErrorCode },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Versions (VER_xxx)
    VerNotFound,

    // Nodes (NODE_xxx)
    NodeNotFound,

    // Tags (TAG_xxx)
    TagNotFound,
    TagDuplicate,

    // Forks (FORK_xxx)
    ForkCopyFailed,

    // References (REF_xxx)
    RefCrossVersion,

    // Validation (VAL_xxx)
    ValInvalidInput,

    // Database (DB_xxx)
    DbOperationFailed,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // IO / serialization
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::VerNotFound => "VER_001",
            ErrorCode::NodeNotFound => "NODE_001",
            ErrorCode::TagNotFound => "TAG_001",
            ErrorCode::TagDuplicate => "TAG_002",
            ErrorCode::ForkCopyFailed => "FORK_001",
            ErrorCode::RefCrossVersion => "REF_001",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::DbOperationFailed => "DB_001",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::Io => "IO_001",
            ErrorCode::Serialization => "SER_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl ArborError {
    /// Create a version-not-found error.
    pub fn version_not_found(version_id: VersionId) -> Self {
        Self::VersionNotFound {
            version_id,
            code: ErrorCode::VerNotFound,
        }
    }

    /// Create a node-not-found error.
    pub fn node_not_found(node_id: NodeId) -> Self {
        Self::NodeNotFound {
            node_id,
            code: ErrorCode::NodeNotFound,
        }
    }

    /// Create a tag-not-found error.
    pub fn tag_not_found(tag_name: impl Into<String>) -> Self {
        Self::TagNotFound {
            tag_name: tag_name.into(),
            code: ErrorCode::TagNotFound,
        }
    }

    /// Create a duplicate-tag error.
    pub fn duplicate_tag(tag_name: impl Into<String>) -> Self {
        Self::DuplicateTag {
            tag_name: tag_name.into(),
            code: ErrorCode::TagDuplicate,
        }
    }

    /// Wrap the failure that aborted a fork.
    pub fn copy_failed(tag_name: &str, cause: ArborError) -> Self {
        Self::CopyFailed {
            message: format!("fork of tag '{}' rolled back: {}", tag_name, cause),
            code: ErrorCode::ForkCopyFailed,
            source: Some(Box::new(cause)),
        }
    }

    /// Create an invalid-reference error.
    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::InvalidReference {
            message: message.into(),
            code: ErrorCode::RefCrossVersion,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::VersionNotFound { code, .. } => *code,
            Self::NodeNotFound { code, .. } => *code,
            Self::TagNotFound { code, .. } => *code,
            Self::DuplicateTag { code, .. } => *code,
            Self::CopyFailed { code, .. } => *code,
            Self::InvalidReference { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::Io(_) => ErrorCode::Io,
            Self::Serialization(_) => ErrorCode::Serialization,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether this error means a looked-up record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::VersionNotFound { .. } | Self::NodeNotFound { .. } | Self::TagNotFound { .. }
        )
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::VersionNotFound { .. } => Some("Please check the version ID and ensure it exists"),
            Self::TagNotFound { .. } => Some("Please check the tag name; tags are case-sensitive"),
            Self::DuplicateTag { .. } => Some("Tag names are global; choose a different name"),
            Self::CopyFailed { .. } => Some("No records were written; the fork can be retried"),
            Self::InvalidReference { .. } => {
                Some("Edges may only connect nodes of the same version")
            }
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ArborError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_tag_not_found_error() {
        let err = ArborError::tag_not_found("v1.0");
        assert_eq!(err.code(), ErrorCode::TagNotFound);
        assert!(err.to_string().contains("v1.0"));
        assert!(err.is_not_found());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_copy_failed_keeps_cause() {
        let cause = ArborError::database("disk I/O error");
        let err = ArborError::copy_failed("v1.0", cause);

        assert_eq!(err.code(), ErrorCode::ForkCopyFailed);
        assert!(err.to_string().contains("v1.0"));
        let source = err.source().unwrap();
        assert!(source.to_string().contains("disk I/O error"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let err: ArborError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.code(), ErrorCode::DbOperationFailed);
        assert!(err.source().is_some());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::VerNotFound.as_str(), "VER_001");
        assert_eq!(ErrorCode::TagDuplicate.as_str(), "TAG_002");
        assert_eq!(ErrorCode::ForkCopyFailed.as_str(), "FORK_001");
        assert_eq!(ErrorCode::RefCrossVersion.as_str(), "REF_001");
    }

    #[test]
    fn test_node_not_found_display() {
        let err = ArborError::node_not_found(NodeId(42));
        assert_eq!(err.to_string(), "Node not found: 42");
    }
}
