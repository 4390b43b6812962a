//! Index Manager subsystem for aeroquery
//!
//! Indexes live in the store; this module only reconciles declarations.
//!
//! # Invariants
//!
//! - At most one drop-and-recreate per `ensure_index` call
//! - Failures other than a definition conflict surface unchanged

mod errors;
mod manager;

pub use errors::{IndexError, IndexErrorCode, IndexResult, Severity};
pub use manager::{IndexManager, IndexOptions};
