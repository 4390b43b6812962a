//! Association Resolver Tests
//!
//! Stores that cannot join get association leaves rewritten into local
//! `in` conditions before compile:
//! - Results equal the joined results
//! - Zero associated matches match zero records
//! - Conditions are cast through the associated model's field types

use std::sync::Arc;

use aeroquery::criteria::{ConditionKind, Expression};
use aeroquery::planner::PlanCompiler;
use aeroquery::resolver::{AssociationResolver, NO_MATCH_SENTINEL};
use aeroquery::schema::{AssociationDescriptor, Catalog, FieldDef, FieldType, ModelSchema};
use aeroquery::store::{MemoryStore, SortDirection, StoreHandle};
use aeroquery::QueryEngine;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn catalog() -> Arc<Catalog> {
    let authors = ModelSchema::new("Author", "authors")
        .with_field("name", FieldDef::required(FieldType::String))
        .with_field("age", FieldDef::optional(FieldType::Int));
    let books = ModelSchema::new("Book", "books")
        .with_field("title", FieldDef::required(FieldType::String))
        .with_association(AssociationDescriptor::belongs_to(
            "Author", "Author", "authors", "author_id",
        ));
    Arc::new(Catalog::from_models([authors, books]).unwrap())
}

async fn engine(store: MemoryStore) -> QueryEngine {
    let engine = QueryEngine::new(Arc::new(store), catalog());
    let ann = engine
        .insert("Author", json!({"name": "Ann", "age": 40}))
        .await
        .unwrap();
    let bob = engine
        .insert("Author", json!({"name": "Bob", "age": 25}))
        .await
        .unwrap();
    for (title, author) in [("a", &ann), ("b", &ann), ("c", &bob)] {
        engine
            .insert("Book", json!({"title": title, "author_id": author.id().cloned()}))
            .await
            .unwrap();
    }
    engine
        .insert("Book", json!({"title": "anon", "author_id": null}))
        .await
        .unwrap();
    engine
        .insert("Book", json!({"title": "orphan", "author_id": "missing-author"}))
        .await
        .unwrap();
    engine
}

fn titles(items: &[Value]) -> Vec<Value> {
    items.iter().map(|b| b["title"].clone()).collect()
}

// =============================================================================
// Equivalence
// =============================================================================

/// Both store kinds return the same page and count.
#[tokio::test]
async fn test_resolved_equals_joined() {
    let mut results = Vec::new();
    for store in [MemoryStore::new(), MemoryStore::without_joins()] {
        let engine = engine(store).await;
        let mut criteria = engine.criteria("Book").unwrap();
        criteria.where_path("Author.age").gt("30").unwrap();
        criteria.sort("title", SortDirection::Asc);
        let page = engine.find(criteria).await.unwrap();
        results.push((titles(&page.items), page.available));
    }
    assert_eq!(results[0].0, vec![json!("a"), json!("b")]);
    assert_eq!(results[0].1, Some(2));
    assert_eq!(results[0], results[1]);
}

/// A key with no associated record never matches, even a negated condition.
#[tokio::test]
async fn test_dangling_key_agrees() {
    let mut results = Vec::new();
    for store in [MemoryStore::new(), MemoryStore::without_joins()] {
        let engine = engine(store).await;
        let mut criteria = engine.criteria("Book").unwrap();
        criteria.where_path("Author.name").ne("Bob").unwrap();
        criteria.sort("title", SortDirection::Asc);
        let page = engine.find(criteria).await.unwrap();
        results.push((titles(&page.items), page.available));
    }
    assert_eq!(results[0].0, vec![json!("a"), json!("b")]);
    assert_eq!(results[0].1, Some(2));
    assert_eq!(results[0], results[1]);
}

// =============================================================================
// Zero Matches
// =============================================================================

/// No matching author rewrites to the sentinel and matches nothing.
#[tokio::test]
async fn test_zero_matches_match_nothing() {
    let engine = engine(MemoryStore::without_joins()).await;

    let mut criteria = engine.criteria("Book").unwrap();
    criteria.where_path("Author.name").equals("Nobody").unwrap();
    criteria.normalize().unwrap();

    let resolver = AssociationResolver::new(engine.store().clone());
    assert!(resolver.is_required());
    assert_eq!(resolver.resolve(&mut criteria).await.unwrap(), 1);
    assert!(criteria.association_fields().is_empty());

    let field = criteria
        .tree()
        .field_ids()
        .into_iter()
        .find_map(|id| match criteria.tree().get(id) {
            Some(Expression::Field(f)) => Some(f.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(field.target_path, "author_id");
    assert_eq!(field.items[0].kind, ConditionKind::In);
    assert_eq!(field.items[0].value, json!([NO_MATCH_SENTINEL]));
    assert!(!PlanCompiler::compile(&criteria).unwrap().is_pipeline());

    let mut criteria = engine.criteria("Book").unwrap();
    criteria.where_path("Author.name").equals("Nobody").unwrap();
    let page = engine.find(criteria).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(page.available, Some(0));
}

/// A store without joins never needs the resolver to touch local criteria.
#[tokio::test]
async fn test_local_criteria_untouched() {
    let store: StoreHandle = Arc::new(MemoryStore::without_joins());
    let resolver = AssociationResolver::new(store.clone());
    let engine = QueryEngine::new(store, catalog());

    let mut criteria = engine.criteria("Book").unwrap();
    criteria.where_path("title").equals("a").unwrap();
    assert_eq!(resolver.resolve(&mut criteria).await.unwrap(), 0);
}

/// Joins on a store that reports the capability skip resolution entirely.
#[tokio::test]
async fn test_not_required_with_joins() {
    let resolver = AssociationResolver::new(Arc::new(MemoryStore::new()));
    assert!(!resolver.is_required());
}
