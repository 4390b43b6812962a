//! Write conflict translation
//!
//! A unique-constraint rejection is bad input, not an infrastructure
//! failure. [`translate_write_error`] turns it into a [`ValidationViolation`]
//! and passes every other store error through untouched.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::errors::StoreError;

/// Kind of validation violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A unique index already holds this key
    NotUnique,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::NotUnique => "not_unique",
        }
    }
}

/// Structured description of rejected input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationViolation {
    /// Violation kind
    pub kind: ViolationKind,
    /// Collection the write targeted
    pub collection: String,
    /// Fields that make up the violated constraint
    pub fields: Vec<String>,
    /// Offending value(s)
    pub value: Value,
    /// Name of the violated index
    pub index: String,
}

impl fmt::Display for ValidationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} violation on {}({}) for value {}",
            self.kind.as_str(),
            self.collection,
            self.fields.join(", "),
            self.value
        )
    }
}

/// Error returned by write operations
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    /// The input violated a constraint
    #[error("Validation violation: {0}")]
    Violation(ValidationViolation),

    /// The store failed for another reason
    #[error(transparent)]
    Store(StoreError),
}

impl WriteError {
    /// Returns the violation if this is bad input
    pub fn violation(&self) -> Option<&ValidationViolation> {
        match self {
            WriteError::Violation(v) => Some(v),
            WriteError::Store(_) => None,
        }
    }
}

/// Translates a store write error into a [`WriteError`]
pub fn translate_write_error(err: StoreError) -> WriteError {
    match err {
        StoreError::DuplicateKey {
            collection,
            index,
            fields,
            key,
        } => {
            let value = match key {
                Value::Array(mut parts) if parts.len() == 1 => parts.remove(0),
                other => other,
            };
            WriteError::Violation(ValidationViolation {
                kind: ViolationKind::NotUnique,
                collection,
                fields,
                value,
                index,
            })
        }
        other => WriteError::Store(other),
    }
}
