//! Index Manager for aeroquery
//!
//! Reconciles declared indexes with the store.
//!
//! # API
//!
//! - `ensure_index(collection, keys, options)` - Create, healing a same-name
//!   definition conflict with one drop-and-recreate
//! - `ensure_model_indexes(model)` - Apply every index a model declares

use crate::observability::{log_event, Event};
use crate::schema::ModelSchema;
use crate::store::{IndexSpec, SortSpec, StoreHandle};

use super::errors::{IndexError, IndexResult};

/// Options for a single index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Explicit name; the store convention `field_1_other_-1` when absent
    pub name: Option<String>,
    pub unique: bool,
    pub sparse: bool,
}

/// Index manager bound to one store
pub struct IndexManager {
    store: StoreHandle,
}

impl IndexManager {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Creates the index, dropping and recreating it once if an index with
    /// the same name but a different definition exists.
    pub async fn ensure_index(
        &self,
        collection: &str,
        keys: &[SortSpec],
        options: IndexOptions,
    ) -> IndexResult<()> {
        let spec = IndexSpec {
            name: options
                .name
                .unwrap_or_else(|| IndexSpec::default_name(keys)),
            keys: keys.to_vec(),
            unique: options.unique,
            sparse: options.sparse,
        };

        let first = match self.store.create_index(collection, &spec).await {
            Ok(()) => {
                log_event(
                    Event::IndexCreated,
                    &[("collection", collection), ("index", spec.name.as_str())],
                );
                return Ok(());
            }
            Err(e) => e,
        };

        if !first.is_index_conflict() {
            return Err(IndexError::store(collection, &spec.name, first));
        }

        self.store
            .drop_index(collection, &spec.name)
            .await
            .map_err(|e| IndexError::store(collection, &spec.name, e))?;

        match self.store.create_index(collection, &spec).await {
            Ok(()) => {
                log_event(
                    Event::IndexRecreated,
                    &[("collection", collection), ("index", spec.name.as_str())],
                );
                Ok(())
            }
            Err(e) if e.is_index_conflict() => {
                log_event(
                    Event::IndexConflict,
                    &[("collection", collection), ("index", spec.name.as_str())],
                );
                Err(IndexError::conflict(collection, &spec.name, e))
            }
            Err(e) => Err(IndexError::store(collection, &spec.name, e)),
        }
    }

    /// Applies every declared index; returns the index names in declaration order
    pub async fn ensure_model_indexes(&self, model: &ModelSchema) -> IndexResult<Vec<String>> {
        let mut names = Vec::with_capacity(model.indexes.len());
        for declaration in &model.indexes {
            let name = declaration
                .name
                .clone()
                .unwrap_or_else(|| IndexSpec::default_name(&declaration.fields));
            let options = IndexOptions {
                name: Some(name.clone()),
                unique: declaration.unique,
                sparse: declaration.sparse,
            };
            self.ensure_index(&model.collection, &declaration.fields, options)
                .await?;
            names.push(name);
        }
        Ok(names)
    }
}
