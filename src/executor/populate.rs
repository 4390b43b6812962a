//! Association population
//!
//! After a page is fetched, each requested alias is loaded with one `$in`
//! query and attached to the records: singular associations as an object
//! (or absent), others as an array. Population never touches `available`.
//!
//! A projected page still needs the local keys population reads, so
//! [`Populator::hidden_keys`] widens the projection before the fetch and
//! [`Populator::restore_projection`] narrows the records afterwards.

use std::collections::{HashMap, HashSet};

use futures_util::future::try_join_all;
use serde_json::{json, Value};

use super::errors::{ExecutorError, ExecutorResult};
use crate::schema::{AssociationDescriptor, ModelSchema};
use crate::store::{first_value, project, remove_field, set_path, FindOptions, StoreHandle};

/// Loads associated records for a page
pub struct Populator {
    store: StoreHandle,
}

impl Populator {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Local keys of `aliases` that a non-empty `projection` would drop
    pub fn hidden_keys(
        model: &ModelSchema,
        aliases: &[String],
        projection: &[String],
    ) -> Vec<String> {
        if projection.is_empty() {
            return Vec::new();
        }
        let mut hidden: Vec<String> = Vec::new();
        for association in aliases.iter().filter_map(|alias| model.get_association(alias)) {
            let key = &association.local_key;
            if !projection.contains(key) && !hidden.contains(key) {
                hidden.push(key.clone());
            }
        }
        hidden
    }

    /// Re-applies the caller's `projection`, keeping the populated aliases
    pub fn restore_projection(items: &mut [Value], projection: &[String], aliases: &[String]) {
        let keep: Vec<String> = projection.iter().chain(aliases).cloned().collect();
        for item in items.iter_mut() {
            *item = project(item, &keep);
        }
    }

    /// Attaches every alias to every record; aliases load concurrently
    pub async fn populate(
        &self,
        model: &ModelSchema,
        items: &mut [Value],
        aliases: &[String],
    ) -> ExecutorResult<()> {
        if items.is_empty() || aliases.is_empty() {
            return Ok(());
        }

        let associations = aliases
            .iter()
            .map(|alias| {
                model
                    .get_association(alias)
                    .ok_or_else(|| ExecutorError::unknown_association(&model.name, alias))
            })
            .collect::<ExecutorResult<Vec<_>>>()?;

        let page: &[Value] = items;
        let loaded =
            try_join_all(associations.iter().map(|association| self.load(association, page)))
                .await?;

        for (association, related) in associations.iter().zip(loaded) {
            attach(items, association, &related);
        }
        Ok(())
    }

    async fn load(
        &self,
        association: &AssociationDescriptor,
        items: &[Value],
    ) -> ExecutorResult<Vec<Value>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for item in items {
            for key in key_values(item, &association.local_key) {
                if seen.insert(key.to_string()) {
                    keys.push(key.clone());
                }
            }
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let filter = json!({ association.foreign_key.as_str(): { "$in": keys } });
        self.store
            .find(&association.collection, &filter, &FindOptions::default())
            .await
            .map_err(|e| ExecutorError::populate_failed(&association.alias, e))
    }
}

/// Non-null values at `path`, with one array level flattened
fn key_values<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    match first_value(document, path) {
        Some(Value::Array(values)) => values.iter().filter(|v| !v.is_null()).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(value) => vec![value],
    }
}

fn attach(items: &mut [Value], association: &AssociationDescriptor, related: &[Value]) {
    let mut by_key: HashMap<String, Vec<&Value>> = HashMap::new();
    for record in related {
        for key in key_values(record, &association.foreign_key) {
            by_key.entry(key.to_string()).or_default().push(record);
        }
    }

    for item in items.iter_mut() {
        let matches: Vec<Value> = key_values(item, &association.local_key)
            .into_iter()
            .filter_map(|key| by_key.get(&key.to_string()))
            .flatten()
            .map(|record| (*record).clone())
            .collect();

        if association.singular {
            match matches.into_iter().next() {
                Some(record) => set_path(item, &association.alias, record),
                None => remove_field(item, &association.alias),
            }
        } else {
            set_path(item, &association.alias, Value::Array(matches));
        }
    }
}
