//! Association resolver
//!
//! For stores without `$lookup`, each association leaf is answered by a
//! sub-query on the associated collection and replaced, in the same group
//! position, by a local `in` condition on the foreign key.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::errors::{ResolverError, ResolverResult};
use crate::criteria::{Condition, ConditionKind, Criteria, FieldExpression};
use crate::observability::{log_event, Event};
use crate::store::{first_value, Capability, FindOptions, StoreHandle};

/// Key substituted when a sub-query matches nothing.
///
/// The nil UUID. Identifier generation only produces v4 UUIDs, whose version
/// nibble is never zero, so no stored key can equal it. An empty `in` list is
/// never emitted.
pub const NO_MATCH_SENTINEL: &str = "00000000-0000-0000-0000-000000000000";

/// Rewrites association leaves into local conditions
pub struct AssociationResolver {
    store: StoreHandle,
}

impl AssociationResolver {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// True when the store cannot join and leaves must be rewritten
    pub fn is_required(&self) -> bool {
        !self
            .store
            .capabilities()
            .supports(Capability::QueryingAssociations)
    }

    /// Rewrites every association leaf in place.
    ///
    /// Sub-queries run one after another; the first failure aborts and the
    /// criteria must not be executed. Leaves naming an unknown alias are left
    /// for the planner to reject. Returns the number of leaves rewritten.
    pub async fn resolve(&self, criteria: &mut Criteria) -> ResolverResult<usize> {
        let mut rewritten = 0;

        for id in criteria.association_fields() {
            let Some(field) = criteria.tree().field(id).cloned() else {
                continue;
            };
            let Some(alias) = field.association.clone() else {
                continue;
            };
            let Some(association) = criteria.model().get_association(&alias).cloned() else {
                continue;
            };

            let local = FieldExpression::local(field.target_path, field.items);
            let filter = local_filter(&local);
            let options = FindOptions {
                projection: vec![association.foreign_key.clone()],
                ..FindOptions::default()
            };

            let records = self
                .store
                .find(&association.collection, &filter, &options)
                .await
                .map_err(|e| ResolverError::query_failed(&alias, &association.collection, e))?;

            let mut keys = collect_keys(&records, &association.foreign_key);
            let matched = keys.len();
            if keys.is_empty() {
                keys.push(Value::from(NO_MATCH_SENTINEL));
            }

            let replacement = FieldExpression::local(
                association.local_key.clone(),
                vec![Condition::native(ConditionKind::In, Value::Array(keys))],
            );
            criteria
                .replace(id, replacement)
                .map_err(|e| ResolverError::invalid_criteria(&alias, &e))?;
            rewritten += 1;

            log_event(
                Event::AssociationResolved,
                &[
                    ("alias", alias.as_str()),
                    ("collection", association.collection.as_str()),
                    ("keys", matched.to_string().as_str()),
                ],
            );
        }
        Ok(rewritten)
    }
}

/// Native filter for a local leaf: `{"$and": [{path: fragment}, ...]}`
fn local_filter(field: &FieldExpression) -> Value {
    let items: Vec<Value> = field
        .items
        .iter()
        .map(|condition| {
            let mut fragment = Map::new();
            fragment.insert(field.target_path.clone(), condition.to_fragment());
            Value::Object(fragment)
        })
        .collect();

    if items.is_empty() {
        Value::Object(Map::new())
    } else {
        let mut filter = Map::new();
        filter.insert("$and".to_string(), Value::Array(items));
        Value::Object(filter)
    }
}

/// Ordered, de-duplicated key values; arrays are flattened
fn collect_keys(records: &[Value], path: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    let mut push = |value: &Value| {
        if !value.is_null() && seen.insert(value.to_string()) {
            keys.push(value.clone());
        }
    };

    for record in records {
        match first_value(record, path) {
            Some(Value::Array(values)) => values.iter().for_each(&mut push),
            Some(value) => push(value),
            None => {}
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AssociationDescriptor, Catalog, FieldDef, FieldType, ModelSchema};
    use crate::store::{DocumentStore, MemoryStore, StoreError, StoreResult};
    use serde_json::json;
    use std::sync::Arc;

    fn catalog() -> Arc<Catalog> {
        let person = ModelSchema::new("Person", "people")
            .with_field("name", FieldDef::required(FieldType::String));
        let post = ModelSchema::new("Post", "posts")
            .with_field("author_id", FieldDef::optional(FieldType::Id))
            .with_association(AssociationDescriptor::belongs_to(
                "Author", "Person", "people", "author_id",
            ));
        Arc::new(Catalog::from_models(vec![person, post]).unwrap())
    }

    async fn seeded() -> StoreResult<Arc<MemoryStore>> {
        let store = Arc::new(MemoryStore::without_joins());
        store
            .insert("people", json!({"_id": "a1", "name": "Angela"}))
            .await?;
        store
            .insert("people", json!({"_id": "a2", "name": "Angelo"}))
            .await?;
        store
            .insert("people", json!({"_id": "a3", "name": "Bob"}))
            .await?;
        Ok(store)
    }

    fn in_values(criteria: &Criteria) -> Value {
        let id = criteria.tree().field_ids()[0];
        let field = criteria.tree().field(id).unwrap();
        assert_eq!(field.association, None);
        assert_eq!(field.target_path, "author_id");
        assert!(!field.items[0].cast);
        field.items[0].value.clone()
    }

    #[tokio::test]
    async fn test_rewrites_to_local_in() {
        let store = seeded().await.unwrap();
        let resolver = AssociationResolver::new(store);
        assert!(resolver.is_required());

        let mut criteria = Criteria::new(catalog(), "Post").unwrap();
        criteria.where_path("Author.name").contains("angel").unwrap();

        assert_eq!(resolver.resolve(&mut criteria).await.unwrap(), 1);
        assert_eq!(in_values(&criteria), json!(["a1", "a2"]));
        assert!(criteria.association_fields().is_empty());
    }

    #[tokio::test]
    async fn test_no_match_uses_sentinel() {
        let store = seeded().await.unwrap();
        let resolver = AssociationResolver::new(store);

        let mut criteria = Criteria::new(catalog(), "Post").unwrap();
        criteria.where_path("Author.name").contains("jel").unwrap();
        resolver.resolve(&mut criteria).await.unwrap();

        assert_eq!(in_values(&criteria), json!([NO_MATCH_SENTINEL]));
    }

    #[test]
    fn test_collect_keys_flattens_and_dedups() {
        let records = vec![
            json!({"k": "x"}),
            json!({"k": ["y", "x"]}),
            json!({"k": null}),
            json!({}),
        ];
        assert_eq!(collect_keys(&records, "k"), vec![json!("x"), json!("y")]);
    }

    #[test]
    fn test_local_filter_shape() {
        let field = FieldExpression::local(
            "name",
            vec![Condition::new(ConditionKind::Equals, json!("Bob"))],
        );
        assert_eq!(local_filter(&field), json!({"$and": [{"name": "Bob"}]}));
        assert_eq!(local_filter(&FieldExpression::local("name", vec![])), json!({}));
    }

    struct FailingStore;

    impl DocumentStore for FailingStore {
        fn capabilities(&self) -> crate::store::Capabilities {
            crate::store::Capabilities::none()
        }

        fn count<'a>(&'a self, _: &'a str, _: &'a Value) -> crate::store::StoreFuture<'a, u64> {
            Box::pin(async { Err(StoreError::unavailable("down")) })
        }

        fn find<'a>(
            &'a self,
            _: &'a str,
            _: &'a Value,
            _: &'a FindOptions,
        ) -> crate::store::StoreFuture<'a, Vec<Value>> {
            Box::pin(async { Err(StoreError::unavailable("down")) })
        }

        fn aggregate<'a>(
            &'a self,
            _: &'a str,
            _: &'a [Value],
        ) -> crate::store::StoreFuture<'a, Vec<Value>> {
            Box::pin(async { Err(StoreError::unavailable("down")) })
        }

        fn insert<'a>(&'a self, _: &'a str, _: Value) -> crate::store::StoreFuture<'a, Value> {
            Box::pin(async { Err(StoreError::unavailable("down")) })
        }

        fn create_index<'a>(
            &'a self,
            _: &'a str,
            _: &'a crate::store::IndexSpec,
        ) -> crate::store::StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::unavailable("down")) })
        }

        fn drop_index<'a>(&'a self, _: &'a str, _: &'a str) -> crate::store::StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::unavailable("down")) })
        }

        fn list_indexes<'a>(
            &'a self,
            _: &'a str,
        ) -> crate::store::StoreFuture<'a, Vec<crate::store::IndexSpec>> {
            Box::pin(async { Err(StoreError::unavailable("down")) })
        }
    }

    #[tokio::test]
    async fn test_sub_query_failure_aborts() {
        let resolver = AssociationResolver::new(Arc::new(FailingStore));
        let mut criteria = Criteria::new(catalog(), "Post").unwrap();
        criteria.where_path("Author.name").equals("Bob").unwrap();

        let err = resolver.resolve(&mut criteria).await.unwrap_err();
        assert_eq!(err.code().code(), "AERO_RESOLVE_QUERY_FAILED");
        assert_eq!(criteria.association_fields().len(), 1);
    }
}
