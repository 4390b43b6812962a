//! Index error types
//!
//! Error codes:
//! - AERO_INDEX_CONFLICT (ERROR): the definition still conflicts after one
//!   drop-and-recreate
//! - AERO_INDEX_STORE_FAILED (ERROR): any other store failure, carried unchanged

use std::fmt;

use crate::store::StoreError;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Index state could not be reconciled; queries still work
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Conflict survived the single retry
    AeroIndexConflict,
    /// Store failed for another reason
    AeroIndexStoreFailed,
}

impl IndexErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::AeroIndexConflict => "AERO_INDEX_CONFLICT",
            IndexErrorCode::AeroIndexStoreFailed => "AERO_INDEX_STORE_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
    /// Index name the operation targeted
    index: String,
    source: StoreError,
}

impl IndexError {
    /// Conflict reported again after drop-and-recreate
    pub fn conflict(collection: &str, index: &str, source: StoreError) -> Self {
        Self {
            code: IndexErrorCode::AeroIndexConflict,
            message: format!(
                "Index '{}' on {} still conflicts after recreate: {}",
                index, collection, source
            ),
            index: index.to_string(),
            source,
        }
    }

    /// Any other store failure
    pub fn store(collection: &str, index: &str, source: StoreError) -> Self {
        Self {
            code: IndexErrorCode::AeroIndexStoreFailed,
            message: format!("Index '{}' on {} failed: {}", index, collection, source),
            index: index.to_string(),
            source,
        }
    }

    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Store error, unchanged
    pub fn store_error(&self) -> &StoreError {
        &self.source
    }

    pub fn is_conflict(&self) -> bool {
        self.code == IndexErrorCode::AeroIndexConflict
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
