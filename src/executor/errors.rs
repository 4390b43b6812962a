//! Executor error types
//!
//! Error codes:
//! - AERO_QUERY_EXECUTION_FAILED (ERROR)
//! - AERO_POPULATE_FAILED (ERROR)
//! - AERO_POPULATE_UNKNOWN_ASSOCIATION (REJECT)
//!
//! Store errors are carried unchanged so callers can decide on retries.

use std::fmt;

use crate::store::StoreError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller asked for something the model does not declare
    Reject,
    /// Store failed; the system is otherwise healthy
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Executor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// The store rejected the count or items branch
    AeroQueryExecutionFailed,
    /// Loading populated records failed
    AeroPopulateFailed,
    /// Populate alias not declared on the model
    AeroPopulateUnknownAssociation,
}

impl ExecutorErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::AeroQueryExecutionFailed => "AERO_QUERY_EXECUTION_FAILED",
            ExecutorErrorCode::AeroPopulateFailed => "AERO_POPULATE_FAILED",
            ExecutorErrorCode::AeroPopulateUnknownAssociation => {
                "AERO_POPULATE_UNKNOWN_ASSOCIATION"
            }
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::AeroPopulateUnknownAssociation => Severity::Reject,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    /// Store error, unchanged
    source: Option<StoreError>,
}

impl ExecutorError {
    /// The store failed a query branch
    pub fn execution_failed(collection: &str, source: StoreError) -> Self {
        Self {
            code: ExecutorErrorCode::AeroQueryExecutionFailed,
            message: format!("Query on {} failed: {}", collection, source),
            source: Some(source),
        }
    }

    /// The store failed a populate query
    pub fn populate_failed(alias: &str, source: StoreError) -> Self {
        Self {
            code: ExecutorErrorCode::AeroPopulateFailed,
            message: format!("Populating '{}' failed: {}", alias, source),
            source: Some(source),
        }
    }

    pub fn unknown_association(model: &str, alias: &str) -> Self {
        Self {
            code: ExecutorErrorCode::AeroPopulateUnknownAssociation,
            message: format!("Model '{}' has no association '{}' to populate", model, alias),
            source: None,
        }
    }

    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying store error, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        self.source.as_ref()
    }
}

impl fmt::Display for ExecutorError {
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

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_carried_unchanged() {
        let err = ExecutorError::execution_failed("posts", StoreError::rejected("bad stage"));
        assert_eq!(err.code().code(), "AERO_QUERY_EXECUTION_FAILED");
        assert_eq!(err.severity(), Severity::Error);
        assert!(matches!(err.store_error(), Some(StoreError::Rejected(_))));
    }

    #[test]
    fn test_error_display() {
        let err = ExecutorError::unknown_association("Post", "Editor");
        let display = format!("{}", err);
        assert!(display.starts_with("[REJECT] AERO_POPULATE_UNKNOWN_ASSOCIATION"));
    }
}
