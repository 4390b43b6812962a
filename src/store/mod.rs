//! Document store subsystem
//!
//! Defines the asynchronous [`DocumentStore`] interface consumed by the
//! resolver, executor and index manager, and [`MemoryStore`], an in-process
//! implementation that evaluates native filters and pipelines.
//!
//! # Native formats
//!
//! - Filters: `{"$and": [...]}`, `{"$or": [...]}`, `{path: value}`,
//!   `{path: {"$op": arg}}`
//! - Pipeline stages: `$match`, `$lookup`, `$unwind`, `$sort`, `$skip`,
//!   `$limit`, `$count`, `$project`

mod backend;
mod document;
mod errors;
mod matcher;
mod memory;
mod pipeline;
mod sort;
mod violation;

pub use backend::{
    Capabilities, Capability, DocumentStore, FindOptions, IndexSpec, StoreFuture, StoreHandle,
};
pub use document::{first_value, lookup_path, project, remove_field, set_path, ID_FIELD};
pub use errors::{StoreError, StoreResult};
pub use matcher::FilterMatcher;
pub use memory::MemoryStore;
pub use sort::{compare_values, DocumentSorter, SortDirection, SortSpec};
pub use violation::{translate_write_error, ValidationViolation, ViolationKind, WriteError};
