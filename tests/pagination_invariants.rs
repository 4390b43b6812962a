//! Pagination Invariant Tests
//!
//! - `available` is identical for every skip/limit of one criteria
//! - `items.len() == min(limit, max(0, available - skip))`
//! - The count branch never carries `$sort`, `$skip` or `$limit`

use std::sync::{Arc, Mutex};

use aeroquery::schema::{AssociationDescriptor, Catalog, FieldDef, FieldType, ModelSchema};
use aeroquery::store::{
    Capabilities, DocumentStore, FindOptions, IndexSpec, MemoryStore, SortDirection, StoreFuture,
};
use aeroquery::QueryEngine;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

/// Delegates to a `MemoryStore` and records every aggregate pipeline
struct RecordingStore {
    inner: MemoryStore,
    pipelines: Mutex<Vec<Vec<Value>>>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            pipelines: Mutex::new(Vec::new()),
        }
    }

    fn pipelines(&self) -> Vec<Vec<Value>> {
        self.pipelines.lock().unwrap().clone()
    }
}

impl DocumentStore for RecordingStore {
    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn count<'a>(&'a self, collection: &'a str, filter: &'a Value) -> StoreFuture<'a, u64> {
        self.inner.count(collection, filter)
    }

    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a Value,
        options: &'a FindOptions,
    ) -> StoreFuture<'a, Vec<Value>> {
        self.inner.find(collection, filter, options)
    }

    fn aggregate<'a>(
        &'a self,
        collection: &'a str,
        stages: &'a [Value],
    ) -> StoreFuture<'a, Vec<Value>> {
        self.pipelines.lock().unwrap().push(stages.to_vec());
        self.inner.aggregate(collection, stages)
    }

    fn insert<'a>(&'a self, collection: &'a str, document: Value) -> StoreFuture<'a, Value> {
        self.inner.insert(collection, document)
    }

    fn create_index<'a>(&'a self, collection: &'a str, spec: &'a IndexSpec) -> StoreFuture<'a, ()> {
        self.inner.create_index(collection, spec)
    }

    fn drop_index<'a>(&'a self, collection: &'a str, name: &'a str) -> StoreFuture<'a, ()> {
        self.inner.drop_index(collection, name)
    }

    fn list_indexes<'a>(&'a self, collection: &'a str) -> StoreFuture<'a, Vec<IndexSpec>> {
        self.inner.list_indexes(collection)
    }
}

fn catalog() -> Arc<Catalog> {
    let teams = ModelSchema::new("Team", "teams")
        .with_field("name", FieldDef::required(FieldType::String));
    let players = ModelSchema::new("Player", "players")
        .with_field("rank", FieldDef::required(FieldType::Int))
        .with_association(AssociationDescriptor::belongs_to(
            "Team", "Team", "teams", "team_id",
        ));
    Arc::new(Catalog::from_models([teams, players]).unwrap())
}

/// Ten players ranked 0..10; even ranks play for "red"
async fn seed(engine: &QueryEngine) {
    let red = engine.insert("Team", json!({"name": "red"})).await.unwrap();
    let blue = engine.insert("Team", json!({"name": "blue"})).await.unwrap();
    for rank in 0..10 {
        let team = if rank % 2 == 0 { &red } else { &blue };
        engine
            .insert("Player", json!({"rank": rank, "team_id": team.id().cloned()}))
            .await
            .unwrap();
    }
}

async fn engine() -> QueryEngine {
    let engine = QueryEngine::new(Arc::new(MemoryStore::new()), catalog());
    seed(&engine).await;
    engine
}

fn expected_len(available: u64, skip: u64, limit: u64) -> usize {
    limit.min(available.saturating_sub(skip)) as usize
}

// =============================================================================
// Filter Mode
// =============================================================================

/// Count is skip/limit independent for a plain filter.
#[tokio::test]
async fn test_filter_mode_available_is_stable() {
    let engine = engine().await;

    for (skip, limit) in [(0, 3), (3, 3), (4, 10), (20, 5), (0, 0)] {
        let mut criteria = engine.criteria("Player").unwrap();
        criteria.where_path("rank").gte(2).unwrap();
        criteria.sort("rank", SortDirection::Asc).skip(skip).limit(limit);

        let page = engine.find(criteria).await.unwrap();
        assert_eq!(page.available, Some(8), "skip={} limit={}", skip, limit);
        assert_eq!(page.len(), expected_len(8, skip, limit));
    }
}

/// Skip past the end yields an empty page with the full count.
#[tokio::test]
async fn test_skip_beyond_total() {
    let engine = engine().await;
    let mut criteria = engine.criteria("Player").unwrap();
    criteria.where_path("rank").equals(4).unwrap();
    criteria.skip(100);

    let page = engine.find(criteria).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.available, Some(1));
}

/// Pages in sort order tile the full result.
#[tokio::test]
async fn test_pages_tile_result() {
    let engine = engine().await;
    let mut seen = Vec::new();
    for page_no in 0..4 {
        let mut criteria = engine.criteria("Player").unwrap();
        criteria.sort("rank", SortDirection::Desc).skip(page_no * 3).limit(3);
        let page = engine.find(criteria).await.unwrap();
        seen.extend(page.items.iter().map(|p| p["rank"].as_i64().unwrap()));
    }
    assert_eq!(seen, (0..10).rev().collect::<Vec<_>>());
}

// =============================================================================
// Pipeline Mode
// =============================================================================

/// Count is skip/limit independent when a join is compiled.
#[tokio::test]
async fn test_pipeline_mode_available_is_stable() {
    let engine = engine().await;

    for (skip, limit) in [(0, 2), (2, 2), (4, 2), (5, 2), (100, 2)] {
        let mut criteria = engine.criteria("Player").unwrap();
        criteria.where_path("Team.name").equals("red").unwrap();
        criteria.sort("rank", SortDirection::Asc).skip(skip).limit(limit);

        let page = engine.find(criteria).await.unwrap();
        assert_eq!(page.available, Some(5));
        assert_eq!(page.len(), expected_len(5, skip, limit));
    }
}

/// The count branch is the prefix plus `$count` only.
#[tokio::test]
async fn test_count_branch_has_no_paging_stages() {
    let store = Arc::new(RecordingStore::new());
    let engine = QueryEngine::new(store.clone(), catalog());
    seed(&engine).await;

    let mut criteria = engine.criteria("Player").unwrap();
    criteria.where_path("Team.name").equals("blue").unwrap();
    criteria.sort("rank", SortDirection::Asc).skip(1).limit(2);
    let page = engine.find(criteria).await.unwrap();
    assert_eq!(page.available, Some(5));
    assert_eq!(page.len(), 2);

    let pipelines = store.pipelines();
    assert_eq!(pipelines.len(), 2);

    let count = pipelines
        .iter()
        .find(|p| p.last().map_or(false, |s| s.get("$count").is_some()))
        .expect("count branch");
    for stage in count {
        assert!(stage.get("$skip").is_none());
        assert!(stage.get("$limit").is_none());
        assert!(stage.get("$sort").is_none());
    }

    let items = pipelines
        .iter()
        .find(|p| p.last().map_or(false, |s| s.get("$count").is_none()))
        .expect("items branch");
    let tail: Vec<&str> = items[items.len() - 3..]
        .iter()
        .filter_map(|s| s.as_object().and_then(|m| m.keys().next()).map(String::as_str))
        .collect();
    assert_eq!(tail, vec!["$sort", "$skip", "$limit"]);
    assert_eq!(&count[..count.len() - 1], &items[..items.len() - 3]);
}

/// Opting out of the total returns no count.
#[tokio::test]
async fn test_available_opt_out() {
    let engine = engine().await;
    let mut criteria = engine.criteria("Player").unwrap();
    criteria.available(false).limit(1);

    let page = engine.find(criteria).await.unwrap();
    assert_eq!(page.available, None);
    assert_eq!(page.len(), 1);
}
