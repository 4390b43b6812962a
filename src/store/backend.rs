//! Document store interface
//!
//! The core never owns a store. Callers hand a [`StoreHandle`] to the
//! resolver, executor and index manager explicitly.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::StoreResult;
use super::sort::{SortDirection, SortSpec};

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Shared handle to a document store
pub type StoreHandle = Arc<dyn DocumentStore>;

/// Optional store features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Cross-collection joins inside an aggregation pipeline (`$lookup`)
    QueryingAssociations,
}

/// Set of capabilities a store supports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    supported: HashSet<Capability>,
}

impl Capabilities {
    /// No optional capabilities
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds a capability
    pub fn with(mut self, capability: Capability) -> Self {
        self.supported.insert(capability);
        self
    }

    /// Checks whether a capability is supported
    pub fn supports(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }
}

/// Options for a `find` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Fields to keep (empty keeps all)
    pub projection: Vec<String>,
    /// Sort order
    pub sort: Vec<SortSpec>,
    /// Records to skip
    pub skip: u64,
    /// Maximum records to return
    pub limit: Option<u64>,
}

/// Native index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name, unique per collection
    pub name: String,
    /// Indexed fields in key order
    pub keys: Vec<SortSpec>,
    /// Reject duplicate keys
    #[serde(default)]
    pub unique: bool,
    /// Skip documents missing every indexed field
    #[serde(default)]
    pub sparse: bool,
}

impl IndexSpec {
    /// Store naming convention: `field_1_other_-1`
    pub fn default_name(keys: &[SortSpec]) -> String {
        keys.iter()
            .map(|k| format!("{}_{}", k.field, k.direction.as_native()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Returns true if both specs define the same index under the same name
    pub fn same_definition(&self, other: &IndexSpec) -> bool {
        self.keys == other.keys && self.unique == other.unique && self.sparse == other.sparse
    }

    /// Field names in key order
    pub fn fields(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.field.clone()).collect()
    }

    /// Builds an ascending single-field index spec
    pub fn ascending(field: impl Into<String>) -> Self {
        let keys = vec![SortSpec {
            field: field.into(),
            direction: SortDirection::Asc,
        }];
        Self {
            name: Self::default_name(&keys),
            keys,
            unique: false,
            sparse: false,
        }
    }
}

/// Asynchronous document store
///
/// Filters and pipeline stages are native JSON objects; the store is free
/// to reject anything it does not understand.
pub trait DocumentStore: Send + Sync {
    /// Optional features of this store
    fn capabilities(&self) -> Capabilities;

    /// Counts records matching `filter`
    fn count<'a>(&'a self, collection: &'a str, filter: &'a Value) -> StoreFuture<'a, u64>;

    /// Finds records matching `filter`
    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a Value,
        options: &'a FindOptions,
    ) -> StoreFuture<'a, Vec<Value>>;

    /// Runs an aggregation pipeline
    fn aggregate<'a>(&'a self, collection: &'a str, stages: &'a [Value])
        -> StoreFuture<'a, Vec<Value>>;

    /// Inserts a record, returning it with its assigned `_id`
    fn insert<'a>(&'a self, collection: &'a str, document: Value) -> StoreFuture<'a, Value>;

    /// Creates an index
    fn create_index<'a>(&'a self, collection: &'a str, spec: &'a IndexSpec) -> StoreFuture<'a, ()>;

    /// Drops an index by name
    fn drop_index<'a>(&'a self, collection: &'a str, name: &'a str) -> StoreFuture<'a, ()>;

    /// Lists index definitions on a collection
    fn list_indexes<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Vec<IndexSpec>>;
}
