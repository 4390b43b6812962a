//! Association resolver subsystem for aeroquery
//!
//! Runs before compilation when the store lacks
//! `Capability::QueryingAssociations`, so the compiled plan is always a
//! plain filter for such stores.

mod errors;
mod resolver;

pub use errors::{ResolverError, ResolverErrorCode, ResolverResult};
pub use resolver::{AssociationResolver, NO_MATCH_SENTINEL};
