//! Schema error types
//!
//! Error codes:
//! - AERO_SCHEMA_MALFORMED
//! - AERO_SCHEMA_UNKNOWN_MODEL
//! - AERO_SCHEMA_DUPLICATE_MODEL
//! - AERO_SCHEMA_UNKNOWN_ASSOCIATION_TARGET
//! - AERO_SCHEMA_CAST_FAILED

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema file unreadable or not valid JSON
    AeroSchemaMalformed,
    /// Model name not in the catalog
    AeroSchemaUnknownModel,
    /// Two models share a name
    AeroSchemaDuplicateModel,
    /// Association points at a model that does not exist
    AeroSchemaUnknownAssociationTarget,
    /// Value cannot be cast to the field type
    AeroSchemaCastFailed,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::AeroSchemaMalformed => "AERO_SCHEMA_MALFORMED",
            SchemaErrorCode::AeroSchemaUnknownModel => "AERO_SCHEMA_UNKNOWN_MODEL",
            SchemaErrorCode::AeroSchemaDuplicateModel => "AERO_SCHEMA_DUPLICATE_MODEL",
            SchemaErrorCode::AeroSchemaUnknownAssociationTarget => {
                "AERO_SCHEMA_UNKNOWN_ASSOCIATION_TARGET"
            }
            SchemaErrorCode::AeroSchemaCastFailed => "AERO_SCHEMA_CAST_FAILED",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
}

impl SchemaError {
    /// Schema source could not be parsed
    pub fn malformed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::AeroSchemaMalformed,
            message: format!("Malformed schema '{}': {}", source.into(), reason.into()),
        }
    }

    /// Model not found
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::AeroSchemaUnknownModel,
            message: format!("Model '{}' not found", name.into()),
        }
    }

    /// Model declared twice
    pub fn duplicate_model(name: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::AeroSchemaDuplicateModel,
            message: format!("Model '{}' declared more than once", name.into()),
        }
    }

    /// Association target missing
    pub fn unknown_association_target(
        model: impl Into<String>,
        alias: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            code: SchemaErrorCode::AeroSchemaUnknownAssociationTarget,
            message: format!(
                "Association '{}.{}' targets unknown model '{}'",
                model.into(),
                alias.into(),
                target.into()
            ),
        }
    }

    /// Cast failure
    pub fn cast_failed(type_name: &str, value: &serde_json::Value) -> Self {
        Self {
            code: SchemaErrorCode::AeroSchemaCastFailed,
            message: format!("Cannot cast {} to {}", value, type_name),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SchemaError::unknown_model("User").code().code(),
            "AERO_SCHEMA_UNKNOWN_MODEL"
        );
        assert_eq!(
            SchemaError::cast_failed("int", &json!("x")).code(),
            SchemaErrorCode::AeroSchemaCastFailed
        );
    }

    #[test]
    fn test_error_display() {
        let err = SchemaError::unknown_association_target("Post", "Author", "Person");
        let display = err.to_string();
        assert!(display.contains("AERO_SCHEMA_UNKNOWN_ASSOCIATION_TARGET"));
        assert!(display.contains("Post.Author"));
    }
}
