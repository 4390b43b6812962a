//! End-to-end Query Scenarios
//!
//! Builder and JSON request forms run through `QueryEngine` against a
//! `MemoryStore`, with and without native joins.

use std::sync::Arc;

use aeroquery::criteria::{Criteria, GroupKind, Record};
use aeroquery::schema::{AssociationDescriptor, Catalog, FieldDef, FieldType, ModelSchema};
use aeroquery::store::{MemoryStore, SortDirection};
use aeroquery::QueryEngine;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn catalog() -> Arc<Catalog> {
    let parents = ModelSchema::new("Parent", "parents")
        .with_field("name", FieldDef::required(FieldType::String))
        .with_association(AssociationDescriptor::has_many(
            "Children", "Child", "children", "parent_id",
        ));
    let children = ModelSchema::new("Child", "children")
        .with_field("name", FieldDef::required(FieldType::String))
        .with_field("age", FieldDef::optional(FieldType::Int))
        .with_field("born", FieldDef::optional(FieldType::Date))
        .with_field("parent_id", FieldDef::optional(FieldType::Id))
        .with_association(AssociationDescriptor::belongs_to(
            "Parent", "Parent", "parents", "parent_id",
        ));
    Arc::new(Catalog::from_models([parents, children]).unwrap())
}

struct Fixture {
    engine: QueryEngine,
    parent: Record,
}

async fn fixture(store: MemoryStore) -> Fixture {
    let engine = QueryEngine::new(Arc::new(store), catalog());
    let parent = engine.insert("Parent", json!({"name": "Pat"})).await.unwrap();
    engine.insert("Parent", json!({"name": "Lou"})).await.unwrap();

    for (name, age, born) in [
        ("Ada", 3, "2021-03-01T00:00:00.000Z"),
        ("Ben", 7, "2017-06-15T00:00:00.000Z"),
        ("Cyd", 11, "2013-09-30T00:00:00.000Z"),
    ] {
        engine
            .insert(
                "Child",
                json!({"name": name, "age": age, "born": born, "parent_id": parent.id().cloned()}),
            )
            .await
            .unwrap();
    }
    Fixture { engine, parent }
}

fn names(items: &[Value]) -> Vec<&str> {
    items.iter().filter_map(|c| c["name"].as_str()).collect()
}

// =============================================================================
// Pagination with Population
// =============================================================================

/// `limit(1)` + `populate(Parent)` over three matches.
#[tokio::test]
async fn test_limit_one_with_populate() {
    for store in [MemoryStore::new(), MemoryStore::without_joins()] {
        let Fixture { engine, parent } = fixture(store).await;
        let mut criteria = engine.criteria("Child").unwrap();
        let err = criteria.where_path("parent_id").equals(&parent).unwrap_err();
        assert_eq!(err.code().code(), "AERO_CRITERIA_DOMAIN_OBJECT");

        let mut criteria = engine.criteria("Child").unwrap();
        criteria
            .where_path("parent_id")
            .equals(parent.id().cloned().unwrap())
            .unwrap();
        criteria.limit(1).populate("Parent").unwrap();

        let page = engine.find(criteria).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.available, Some(3));
        assert_eq!(page.items[0]["Parent"]["name"], json!("Pat"));
    }
}

/// A projection that omits the local key still populates, then hides the key.
#[tokio::test]
async fn test_select_with_populate() {
    for store in [MemoryStore::new(), MemoryStore::without_joins()] {
        let Fixture { engine, .. } = fixture(store).await;
        let mut criteria = engine.criteria("Child").unwrap();
        criteria.where_path("Parent.name").equals("Pat").unwrap();
        criteria
            .select(["name"])
            .sort("name", SortDirection::Asc)
            .populate("Parent")
            .unwrap();

        let page = engine.find(criteria).await.unwrap();
        assert_eq!(names(&page.items), vec!["Ada", "Ben", "Cyd"]);
        for item in &page.items {
            assert_eq!(item["Parent"]["name"], json!("Pat"));
            assert!(item.get("parent_id").is_none());
            assert!(item.get("age").is_none());
        }
    }
}

/// `skip(100)` with one match yields `[]` and available 1.
#[tokio::test]
async fn test_skip_past_single_match() {
    let Fixture { engine, .. } = fixture(MemoryStore::new()).await;
    let mut criteria = engine.criteria("Child").unwrap();
    criteria.where_path("name").equals("Ben").unwrap();
    criteria.skip(100);

    let page = engine.find(criteria).await.unwrap();
    assert_eq!(page.items, Vec::<Value>::new());
    assert_eq!(page.available, Some(1));
}

/// HasMany population attaches every child and an empty array otherwise.
#[tokio::test]
async fn test_has_many_populate() {
    let Fixture { engine, .. } = fixture(MemoryStore::new()).await;
    let mut criteria = engine.criteria("Parent").unwrap();
    criteria.sort("name", SortDirection::Desc).populate("Children").unwrap();

    let page = engine.find(criteria).await.unwrap();
    assert_eq!(names(&page.items), vec!["Pat", "Lou"]);
    assert_eq!(page.items[0]["Children"].as_array().unwrap().len(), 3);
    assert_eq!(page.items[1]["Children"], json!([]));
}

// =============================================================================
// Builder Groups
// =============================================================================

/// `a OR b` via the builder, cast from strings.
#[tokio::test]
async fn test_or_builder() {
    let Fixture { engine, .. } = fixture(MemoryStore::new()).await;
    let mut criteria = engine.criteria("Child").unwrap();
    criteria.where_path("age").lt("5").unwrap();
    criteria.or().unwrap();
    criteria.where_path("age").gt("10").unwrap();
    criteria.sort("name", SortDirection::Asc);

    let page = engine.find(criteria).await.unwrap();
    assert_eq!(names(&page.items), vec!["Ada", "Cyd"]);
    assert_eq!(page.available, Some(2));
}

/// Dates cast from any RFC 3339 offset before comparison.
#[tokio::test]
async fn test_date_range() {
    let Fixture { engine, .. } = fixture(MemoryStore::new()).await;
    let mut criteria = engine.criteria("Child").unwrap();
    criteria
        .where_path("born")
        .between("2015-01-01T02:00:00+02:00", "2022-01-01T00:00:00Z")
        .unwrap();
    criteria.sort("born", SortDirection::Asc);

    let page = engine.find(criteria).await.unwrap();
    assert_eq!(names(&page.items), vec!["Ben", "Ada"]);
}

/// `not` groups evaluate in process but do not compile to a native filter.
#[tokio::test]
async fn test_not_group() {
    let Fixture { engine, .. } = fixture(MemoryStore::new()).await;
    let mut criteria = engine.criteria("Child").unwrap();
    criteria.where_path("age").gt(1).unwrap();
    criteria.group(GroupKind::Not).unwrap();
    criteria.where_path("name").equals("Ada").unwrap();
    criteria.close();

    assert!(criteria.matches(&json!({"name": "Ben", "age": 7})).unwrap());
    assert!(!criteria.matches(&json!({"name": "Ada", "age": 3})).unwrap());

    let err = engine.find(criteria).await.unwrap_err();
    assert_eq!(err.code(), "AERO_COMPILE_UNSUPPORTED_GROUP");
}

/// `contains` is a case-insensitive literal substring match.
#[tokio::test]
async fn test_contains_is_literal() {
    let Fixture { engine, .. } = fixture(MemoryStore::new()).await;
    let mut criteria = engine.criteria("Child").unwrap();
    criteria.where_path("name").contains("y").unwrap();
    assert_eq!(names(&engine.find(criteria).await.unwrap().items), vec!["Cyd"]);

    let mut criteria = engine.criteria("Child").unwrap();
    criteria.where_path("name").contains(".*").unwrap();
    assert!(engine.find(criteria).await.unwrap().is_empty());
}

// =============================================================================
// Request Form
// =============================================================================

/// JSON requests compile the same as the builder.
#[tokio::test]
async fn test_request_form() {
    for store in [MemoryStore::new(), MemoryStore::without_joins()] {
        let Fixture { engine, .. } = fixture(store).await;
        let request = json!({
            "where": {
                "Parent.name": "Pat",
                "or": [{"age": {"lte": "3"}}, {"name": {"in": ["Cyd", "Zed"]}}]
            },
            "sort": ["-age"],
            "select": ["name"],
            "limit": 10,
            "available": true
        });
        let criteria = Criteria::from_request(engine.catalog().clone(), "Child", &request).unwrap();

        let page = engine.find(criteria).await.unwrap();
        assert_eq!(names(&page.items), vec!["Cyd", "Ada"]);
        assert_eq!(page.available, Some(2));
        assert!(page.items[0].get("age").is_none());
    }
}

/// Empty `or` group matches nothing; empty criteria matches everything.
#[tokio::test]
async fn test_empty_groups() {
    let Fixture { engine, .. } = fixture(MemoryStore::new()).await;

    let everything = engine.criteria("Child").unwrap();
    assert_eq!(engine.find(everything).await.unwrap().available, Some(3));

    let request = json!({"where": {"or": []}});
    let nothing = Criteria::from_request(engine.catalog().clone(), "Child", &request).unwrap();
    assert_eq!(engine.find(nothing).await.unwrap().available, Some(0));
}
