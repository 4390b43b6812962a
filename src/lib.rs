//! aeroquery - criteria compiler and paginated query executor
//!
//! A [`criteria::Criteria`] tree is normalized against a
//! [`schema::Catalog`], rewritten by the [`resolver`] when the store cannot
//! join, compiled by the [`planner`] into a native filter or pipeline, and
//! run by the [`executor`] as a page plus a skip-independent total.

pub mod cli;
pub mod criteria;
pub mod engine;
pub mod executor;
pub mod index;
pub mod observability;
pub mod planner;
pub mod resolver;
pub mod schema;
pub mod store;

pub use engine::{QueryEngine, QueryError, QueryLimits, QueryResult};
