//! Store error types
//!
//! Store errors are propagated unchanged by the executor; the index manager
//! and write path inspect the variant to decide recovery.

use serde_json::Value;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a document store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A unique index rejected a write
    #[error("Duplicate key in {collection} for index '{index}': {key}")]
    DuplicateKey {
        collection: String,
        index: String,
        fields: Vec<String>,
        key: Value,
    },

    /// An index with this name exists with a different definition
    #[error("Index '{name}' already exists on {collection} with a different definition")]
    IndexConflict { collection: String, name: String },

    /// Index not found (drop by name)
    #[error("Index '{name}' not found on {collection}")]
    IndexNotFound { collection: String, name: String },

    /// The store rejected the request (malformed filter or stage)
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The store has no support for the requested operation
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The store could not be reached or is in a failed state
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create a rejected error
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Create an unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateKey { .. } => "AERO_STORE_DUPLICATE_KEY",
            Self::IndexConflict { .. } => "AERO_STORE_INDEX_CONFLICT",
            Self::IndexNotFound { .. } => "AERO_STORE_INDEX_NOT_FOUND",
            Self::Rejected(_) => "AERO_STORE_REJECTED",
            Self::Unsupported(_) => "AERO_STORE_UNSUPPORTED",
            Self::Unavailable(_) => "AERO_STORE_UNAVAILABLE",
        }
    }

    /// True for a same-name index definition conflict
    pub fn is_index_conflict(&self) -> bool {
        matches!(self, Self::IndexConflict { .. })
    }
}
