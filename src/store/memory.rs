//! In-memory document store
//!
//! Reference implementation of [`DocumentStore`]. Collections are held as
//! insertion-ordered vectors behind a single lock; every operation works on
//! a consistent snapshot and completes without suspending.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use uuid::Uuid;

use super::backend::{Capabilities, Capability, DocumentStore, FindOptions, IndexSpec, StoreFuture};
use super::document::{first_value, project, ID_FIELD};
use super::errors::{StoreError, StoreResult};
use super::matcher::FilterMatcher;
use super::pipeline::PipelineRunner;
use super::sort::DocumentSorter;

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, Vec<Value>>,
    indexes: HashMap<String, Vec<IndexSpec>>,
}

/// In-memory store with optional join support
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    joins_enabled: bool,
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::unavailable("memory store lock poisoned")
}

impl MemoryStore {
    /// Creates a store that supports `$lookup`
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            joins_enabled: true,
        }
    }

    /// Creates a store without cross-collection query support
    pub fn without_joins() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            joins_enabled: false,
        }
    }

    /// Number of records in a collection
    pub fn len(&self, collection: &str) -> StoreResult<usize> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.collections.get(collection).map_or(0, Vec::len))
    }

    fn count_sync(&self, collection: &str, filter: &Value) -> StoreResult<u64> {
        let state = self.state.read().map_err(poisoned)?;
        let mut count = 0u64;
        for doc in state.collections.get(collection).into_iter().flatten() {
            if FilterMatcher::matches(doc, filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn find_sync(
        &self,
        collection: &str,
        filter: &Value,
        options: &FindOptions,
    ) -> StoreResult<Vec<Value>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut matched = Vec::new();
        for doc in state.collections.get(collection).into_iter().flatten() {
            if FilterMatcher::matches(doc, filter)? {
                matched.push(doc.clone());
            }
        }
        drop(state);

        DocumentSorter::sort(&mut matched, &options.sort);

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| project(&doc, &options.projection))
            .collect())
    }

    fn aggregate_sync(&self, collection: &str, stages: &[Value]) -> StoreResult<Vec<Value>> {
        let state = self.state.read().map_err(poisoned)?;
        PipelineRunner::new(&state.collections, self.joins_enabled).run(collection, stages)
    }

    fn insert_sync(&self, collection: &str, mut document: Value) -> StoreResult<Value> {
        let map = document
            .as_object_mut()
            .ok_or_else(|| StoreError::rejected("document must be an object"))?;
        if !map.contains_key(ID_FIELD) {
            map.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut state = self.state.write().map_err(poisoned)?;
        let MemoryState {
            collections,
            indexes,
        } = &mut *state;
        let existing = collections.entry(collection.to_string()).or_default();

        for spec in indexes.get(collection).into_iter().flatten() {
            if !spec.unique {
                continue;
            }
            let Some(key) = unique_key(spec, &document) else {
                continue;
            };
            if existing
                .iter()
                .any(|other| unique_key(spec, other).as_ref() == Some(&key))
            {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    index: spec.name.clone(),
                    fields: spec.fields(),
                    key,
                });
            }
        }

        existing.push(document.clone());
        Ok(document)
    }

    fn create_index_sync(&self, collection: &str, spec: &IndexSpec) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;

        if let Some(current) = state
            .indexes
            .get(collection)
            .and_then(|specs| specs.iter().find(|s| s.name == spec.name))
        {
            if current.same_definition(spec) {
                return Ok(());
            }
            return Err(StoreError::IndexConflict {
                collection: collection.to_string(),
                name: spec.name.clone(),
            });
        }

        if spec.unique {
            let docs = state.collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);
            let mut seen: Vec<Value> = Vec::new();
            for key in docs.iter().filter_map(|doc| unique_key(spec, doc)) {
                if seen.contains(&key) {
                    return Err(StoreError::DuplicateKey {
                        collection: collection.to_string(),
                        index: spec.name.clone(),
                        fields: spec.fields(),
                        key,
                    });
                }
                seen.push(key);
            }
        }

        state
            .indexes
            .entry(collection.to_string())
            .or_default()
            .push(spec.clone());
        Ok(())
    }

    fn drop_index_sync(&self, collection: &str, name: &str) -> StoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let specs = state.indexes.entry(collection.to_string()).or_default();
        let before = specs.len();
        specs.retain(|s| s.name != name);
        if specs.len() == before {
            return Err(StoreError::IndexNotFound {
                collection: collection.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn list_indexes_sync(&self, collection: &str) -> StoreResult<Vec<IndexSpec>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.indexes.get(collection).cloned().unwrap_or_default())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Key tuple of `document` under a unique index; `None` when a sparse
/// index skips the document.
fn unique_key(spec: &IndexSpec, document: &Value) -> Option<Value> {
    let values: Vec<Option<&Value>> = spec
        .keys
        .iter()
        .map(|k| first_value(document, &k.field))
        .collect();
    if spec.sparse && values.iter().all(Option::is_none) {
        return None;
    }
    Some(Value::Array(
        values
            .into_iter()
            .map(|v| v.cloned().unwrap_or(Value::Null))
            .collect(),
    ))
}

impl DocumentStore for MemoryStore {
    fn capabilities(&self) -> Capabilities {
        if self.joins_enabled {
            Capabilities::none().with(Capability::QueryingAssociations)
        } else {
            Capabilities::none()
        }
    }

    fn count<'a>(&'a self, collection: &'a str, filter: &'a Value) -> StoreFuture<'a, u64> {
        Box::pin(async move { self.count_sync(collection, filter) })
    }

    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a Value,
        options: &'a FindOptions,
    ) -> StoreFuture<'a, Vec<Value>> {
        Box::pin(async move { self.find_sync(collection, filter, options) })
    }

    fn aggregate<'a>(
        &'a self,
        collection: &'a str,
        stages: &'a [Value],
    ) -> StoreFuture<'a, Vec<Value>> {
        Box::pin(async move { self.aggregate_sync(collection, stages) })
    }

    fn insert<'a>(&'a self, collection: &'a str, document: Value) -> StoreFuture<'a, Value> {
        Box::pin(async move { self.insert_sync(collection, document) })
    }

    fn create_index<'a>(&'a self, collection: &'a str, spec: &'a IndexSpec) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.create_index_sync(collection, spec) })
    }

    fn drop_index<'a>(&'a self, collection: &'a str, name: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.drop_index_sync(collection, name) })
    }

    fn list_indexes<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Vec<IndexSpec>> {
        Box::pin(async move { self.list_indexes_sync(collection) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortSpec;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = MemoryStore::new();
        let doc = store.insert("users", json!({"name": "Alice"})).await.unwrap();
        let id = doc["_id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(store.len("users").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_sort_skip_limit_projection() {
        let store = MemoryStore::new();
        for (id, age) in [("a", 30), ("b", 20), ("c", 40)] {
            store
                .insert("users", json!({"_id": id, "age": age, "name": id}))
                .await
                .unwrap();
        }
        let options = FindOptions {
            projection: vec!["age".into()],
            sort: vec![SortSpec::asc("age")],
            skip: 1,
            limit: Some(1),
        };
        let found = store.find("users", &json!({}), &options).await.unwrap();
        assert_eq!(found, vec![json!({"_id": "a", "age": 30})]);
        assert_eq!(store.count("users", &json!({"age": {"$gt": 25}})).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate() {
        let store = MemoryStore::new();
        let mut spec = IndexSpec::ascending("email");
        spec.unique = true;
        store.create_index("users", &spec).await.unwrap();
        store.insert("users", json!({"email": "a@x"})).await.unwrap();
        let err = store.insert("users", json!({"email": "a@x"})).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_sparse_unique_allows_missing() {
        let store = MemoryStore::new();
        let mut spec = IndexSpec::ascending("email");
        spec.unique = true;
        spec.sparse = true;
        store.create_index("users", &spec).await.unwrap();
        store.insert("users", json!({"name": "a"})).await.unwrap();
        store.insert("users", json!({"name": "b"})).await.unwrap();
        assert_eq!(store.len("users").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_index_conflict_and_drop() {
        let store = MemoryStore::new();
        let spec = IndexSpec::ascending("email");
        store.create_index("users", &spec).await.unwrap();
        // Same definition is idempotent
        store.create_index("users", &spec).await.unwrap();

        let mut changed = spec.clone();
        changed.unique = true;
        let err = store.create_index("users", &changed).await.unwrap_err();
        assert!(err.is_index_conflict());

        store.drop_index("users", &spec.name).await.unwrap();
        assert!(store.list_indexes("users").await.unwrap().is_empty());
        assert!(matches!(
            store.drop_index("users", &spec.name).await,
            Err(StoreError::IndexNotFound { .. })
        ));
    }
}
