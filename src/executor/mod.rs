//! Paginated executor subsystem for aeroquery
//!
//! # Execution Flow
//!
//! 1. Build the items branch (filter or prefix + `$sort`/`$skip`/`$limit`)
//! 2. Build the count branch (filter or prefix + `$count`)
//! 3. Run both concurrently; either failing fails the call
//! 4. Populate requested associations on the returned page
//!
//! # Invariants
//!
//! - `available` never depends on skip or limit
//! - `items.len() == min(limit, max(0, available - skip))`

mod errors;
mod executor;
mod populate;
mod result;

pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use executor::{count_branch, items_branch, PaginatedExecutor};
pub use populate::Populator;
pub use result::PageResult;
