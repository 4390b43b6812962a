//! Association resolver error types
//!
//! Error codes:
//! - AERO_RESOLVE_QUERY_FAILED (ERROR)
//! - AERO_RESOLVE_INVALID_CRITERIA (REJECT)

use std::fmt;

use crate::criteria::CriteriaError;
use crate::store::StoreError;

/// Resolver-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverErrorCode {
    /// Sub-query against the associated collection failed
    AeroResolveQueryFailed,
    /// Rewritten leaf could not be placed back into the criteria
    AeroResolveInvalidCriteria,
}

impl ResolverErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ResolverErrorCode::AeroResolveQueryFailed => "AERO_RESOLVE_QUERY_FAILED",
            ResolverErrorCode::AeroResolveInvalidCriteria => "AERO_RESOLVE_INVALID_CRITERIA",
        }
    }
}

impl fmt::Display for ResolverErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Association resolution failure; the query must not run
#[derive(Debug, Clone)]
pub struct ResolverError {
    code: ResolverErrorCode,
    message: String,
    alias: String,
    source: Option<StoreError>,
}

impl ResolverError {
    /// Sub-query failed
    pub fn query_failed(alias: impl Into<String>, collection: &str, source: StoreError) -> Self {
        let alias = alias.into();
        Self {
            code: ResolverErrorCode::AeroResolveQueryFailed,
            message: format!(
                "Resolving '{}' against {} failed: {}",
                alias, collection, source
            ),
            alias,
            source: Some(source),
        }
    }

    /// Criteria rejected the rewritten leaf
    pub fn invalid_criteria(alias: impl Into<String>, source: &CriteriaError) -> Self {
        let alias = alias.into();
        Self {
            code: ResolverErrorCode::AeroResolveInvalidCriteria,
            message: format!("Rewriting '{}' failed: {}", alias, source.message()),
            alias,
            source: None,
        }
    }

    pub fn code(&self) -> ResolverErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Association alias being resolved
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Underlying store error, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        self.source.as_ref()
    }
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ResolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;
