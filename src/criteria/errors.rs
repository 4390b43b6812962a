//! Criteria error types
//!
//! Error codes:
//! - AERO_CRITERIA_INVALID_KIND (REJECT)
//! - AERO_CRITERIA_DOMAIN_OBJECT (REJECT)
//! - AERO_CRITERIA_CAST_FAILED (REJECT)
//! - AERO_CRITERIA_INVALID_MOVE (REJECT)
//! - AERO_CRITERIA_INVALID_REQUEST (REJECT)
//! - AERO_CRITERIA_UNKNOWN_MODEL (REJECT)

use std::fmt;

use crate::schema::SchemaError;

/// Severity levels for criteria errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller built an invalid criteria
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Criteria-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaErrorCode {
    /// Condition kind name is not recognized
    AeroCriteriaInvalidKind,
    /// A stored record was used as a condition value
    AeroCriteriaDomainObject,
    /// Condition value cannot be cast to the field type
    AeroCriteriaCastFailed,
    /// Expression move would break single ownership
    AeroCriteriaInvalidMove,
    /// Malformed JSON request or option
    AeroCriteriaInvalidRequest,
    /// Model not in the catalog
    AeroCriteriaUnknownModel,
}

impl CriteriaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            CriteriaErrorCode::AeroCriteriaInvalidKind => "AERO_CRITERIA_INVALID_KIND",
            CriteriaErrorCode::AeroCriteriaDomainObject => "AERO_CRITERIA_DOMAIN_OBJECT",
            CriteriaErrorCode::AeroCriteriaCastFailed => "AERO_CRITERIA_CAST_FAILED",
            CriteriaErrorCode::AeroCriteriaInvalidMove => "AERO_CRITERIA_INVALID_MOVE",
            CriteriaErrorCode::AeroCriteriaInvalidRequest => "AERO_CRITERIA_INVALID_REQUEST",
            CriteriaErrorCode::AeroCriteriaUnknownModel => "AERO_CRITERIA_UNKNOWN_MODEL",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for CriteriaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Criteria error with context
#[derive(Debug, Clone)]
pub struct CriteriaError {
    code: CriteriaErrorCode,
    message: String,
    /// Field path if applicable
    path: Option<String>,
}

impl CriteriaError {
    /// Unknown condition kind
    pub fn invalid_kind(kind: impl Into<String>) -> Self {
        Self {
            code: CriteriaErrorCode::AeroCriteriaInvalidKind,
            message: format!("Unknown condition kind '{}'", kind.into()),
            path: None,
        }
    }

    /// A stored record was passed as a value
    pub fn domain_object(path: impl Into<String>, model: &str) -> Self {
        let p = path.into();
        Self {
            code: CriteriaErrorCode::AeroCriteriaDomainObject,
            message: format!(
                "Condition on '{}' received a {} record; pass its identifier instead",
                p, model
            ),
            path: Some(p),
        }
    }

    /// Cast through the field type failed
    pub fn cast_failed(path: impl Into<String>, source: &SchemaError) -> Self {
        let p = path.into();
        Self {
            code: CriteriaErrorCode::AeroCriteriaCastFailed,
            message: format!("Field '{}': {}", p, source.message()),
            path: Some(p),
        }
    }

    /// Expression move rejected
    pub fn invalid_move(reason: impl Into<String>) -> Self {
        Self {
            code: CriteriaErrorCode::AeroCriteriaInvalidMove,
            message: reason.into(),
            path: None,
        }
    }

    /// Malformed request
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self {
            code: CriteriaErrorCode::AeroCriteriaInvalidRequest,
            message: reason.into(),
            path: None,
        }
    }

    /// Model not found
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self {
            code: CriteriaErrorCode::AeroCriteriaUnknownModel,
            message: format!("Model '{}' not found", name.into()),
            path: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> CriteriaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field path if applicable
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl fmt::Display for CriteriaError {
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

impl std::error::Error for CriteriaError {}

/// Result type for criteria operations
pub type CriteriaResult<T> = Result<T, CriteriaError>;
