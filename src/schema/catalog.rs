//! Model catalog
//!
//! Holds every model schema known to the process, loaded once from a JSON
//! document of the form `{"models": [ModelSchema, ...]}`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::errors::{SchemaError, SchemaResult};
use super::model::ModelSchema;

#[derive(Deserialize)]
struct CatalogFile {
    models: Vec<ModelSchema>,
}

/// Registry of model schemas by name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    models: HashMap<String, Arc<ModelSchema>>,
}

impl Catalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from models, validating association targets
    pub fn from_models(models: impl IntoIterator<Item = ModelSchema>) -> SchemaResult<Self> {
        let mut catalog = Self::new();
        for model in models {
            catalog.add(model)?;
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parses a catalog from JSON text
    pub fn from_json(source: &str, text: &str) -> SchemaResult<Self> {
        let file: CatalogFile =
            serde_json::from_str(text).map_err(|e| SchemaError::malformed(source, e.to_string()))?;
        Self::from_models(file.models)
    }

    /// Loads a catalog from a JSON file
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let source = path.display().to_string();
        let text = fs::read_to_string(path)
            .map_err(|e| SchemaError::malformed(&source, format!("Failed to read: {}", e)))?;
        Self::from_json(&source, &text)
    }

    /// Adds a model. Names must be unique.
    pub fn add(&mut self, model: ModelSchema) -> SchemaResult<()> {
        if self.models.contains_key(&model.name) {
            return Err(SchemaError::duplicate_model(&model.name));
        }
        self.models.insert(model.name.clone(), Arc::new(model));
        Ok(())
    }

    /// Checks that every association targets a known model
    pub fn validate(&self) -> SchemaResult<()> {
        for model in self.models.values() {
            for association in &model.associations {
                if !self.models.contains_key(&association.model) {
                    return Err(SchemaError::unknown_association_target(
                        &model.name,
                        &association.alias,
                        &association.model,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Looks up a model by name
    pub fn model(&self, name: &str) -> Option<Arc<ModelSchema>> {
        self.models.get(name).cloned()
    }

    /// Looks up a model by name, failing if absent
    pub fn require(&self, name: &str) -> SchemaResult<Arc<ModelSchema>> {
        self.model(name)
            .ok_or_else(|| SchemaError::unknown_model(name))
    }

    /// All models, sorted by name
    pub fn models(&self) -> Vec<Arc<ModelSchema>> {
        let mut models: Vec<_> = self.models.values().cloned().collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AssociationDescriptor, SchemaErrorCode};
    use std::io::Write;

    const CATALOG: &str = r#"{
        "models": [
            {"name": "Parent", "collection": "parents"},
            {"name": "Child", "collection": "children",
             "associations": [{"alias": "Parent", "model": "Parent", "collection": "parents",
                               "kind": "belongs_to", "local_key": "parent_id",
                               "foreign_key": "_id", "singular": true}]}
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let catalog = Catalog::from_json("inline", CATALOG).unwrap();
        assert!(catalog.model("Child").is_some());
        assert_eq!(catalog.models().len(), 2);
        assert_eq!(catalog.models()[0].name, "Child");
    }

    #[test]
    fn test_unknown_target_rejected() {
        let child = ModelSchema::new("Child", "children").with_association(
            AssociationDescriptor::belongs_to("Parent", "Parent", "parents", "parent_id"),
        );
        let err = Catalog::from_models(vec![child]).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::AeroSchemaUnknownAssociationTarget);
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let err = Catalog::from_models(vec![
            ModelSchema::new("A", "a"),
            ModelSchema::new("A", "a2"),
        ])
        .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::AeroSchemaDuplicateModel);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let catalog = Catalog::load(file.path()).unwrap();
        assert!(catalog.require("Parent").is_ok());
        assert!(catalog.require("Nobody").is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = Catalog::from_json("inline", "{not json").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::AeroSchemaMalformed);
    }
}
