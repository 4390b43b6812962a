//! Plan compiler error types
//!
//! Error codes:
//! - AERO_COMPILE_NESTED_PIPELINE (REJECT)
//! - AERO_COMPILE_UNSUPPORTED_GROUP (REJECT)
//! - AERO_COMPILE_UNKNOWN_ASSOCIATION (REJECT)

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller or schema bug; never retried
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Compilation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// A nested group references an association
    AeroCompileNestedPipeline,
    /// A `Not` group reached the compiler
    AeroCompileUnsupportedGroup,
    /// Association alias missing from the model
    AeroCompileUnknownAssociation,
}

impl PlannerErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::AeroCompileNestedPipeline => "AERO_COMPILE_NESTED_PIPELINE",
            PlannerErrorCode::AeroCompileUnsupportedGroup => "AERO_COMPILE_UNSUPPORTED_GROUP",
            PlannerErrorCode::AeroCompileUnknownAssociation => "AERO_COMPILE_UNKNOWN_ASSOCIATION",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Compilation error with context
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Association alias if applicable
    alias: Option<String>,
}

impl PlannerError {
    /// Nested group needs a join
    pub fn nested_pipeline(alias: impl Into<String>) -> Self {
        let a = alias.into();
        Self {
            code: PlannerErrorCode::AeroCompileNestedPipeline,
            message: format!(
                "Association '{}' is referenced inside a nested group; joins are only supported at the top level",
                a
            ),
            alias: Some(a),
        }
    }

    /// `Not` groups cannot be compiled
    pub fn unsupported_group(kind: &str) -> Self {
        Self {
            code: PlannerErrorCode::AeroCompileUnsupportedGroup,
            message: format!("Group kind '{}' cannot be compiled", kind),
            alias: None,
        }
    }

    /// Alias not declared on the model
    pub fn unknown_association(model: &str, alias: impl Into<String>) -> Self {
        let a = alias.into();
        Self {
            code: PlannerErrorCode::AeroCompileUnknownAssociation,
            message: format!("Model '{}' has no association '{}'", model, a),
            alias: Some(a),
        }
    }

    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl fmt::Display for PlannerError {
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

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlannerErrorCode::AeroCompileNestedPipeline.code(),
            "AERO_COMPILE_NESTED_PIPELINE"
        );
        assert_eq!(
            PlannerErrorCode::AeroCompileUnsupportedGroup.code(),
            "AERO_COMPILE_UNSUPPORTED_GROUP"
        );
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::unknown_association("Post", "Editor");
        let display = format!("{}", err);
        assert!(display.contains("AERO_COMPILE_UNKNOWN_ASSOCIATION"));
        assert!(display.contains("Editor"));
        assert_eq!(err.alias(), Some("Editor"));
    }
}
