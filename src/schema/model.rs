//! Model schemas and association descriptors
//!
//! A model names its collection, its field types, the associations it can
//! reach and the indexes it declares. The criteria core only reads these.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::{FieldDef, FieldType};
use crate::store::{SortSpec, ID_FIELD};

static ID_FIELD_TYPE: FieldType = FieldType::Id;

/// Association cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Many-to-one: this record holds the foreign key
    BelongsTo,
    /// One-to-many: the associated records hold the foreign key
    HasMany,
}

impl AssociationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationKind::BelongsTo => "belongs_to",
            AssociationKind::HasMany => "has_many",
        }
    }
}

/// Foreign-key relationship from one model to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    /// Capitalized alias used in paths (`Project.name`)
    pub alias: String,
    /// Associated model name
    pub model: String,
    /// Associated collection
    pub collection: String,
    /// Cardinality
    pub kind: AssociationKind,
    /// Key on this model's records
    pub local_key: String,
    /// Key on the associated records
    pub foreign_key: String,
    /// Whether the joined value is a single record
    pub singular: bool,
}

impl AssociationDescriptor {
    /// `local_key` on this record references `_id` of a single parent
    pub fn belongs_to(
        alias: impl Into<String>,
        model: impl Into<String>,
        collection: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            model: model.into(),
            collection: collection.into(),
            kind: AssociationKind::BelongsTo,
            local_key: local_key.into(),
            foreign_key: ID_FIELD.to_string(),
            singular: true,
        }
    }

    /// `foreign_key` on the associated records references this record's `_id`
    pub fn has_many(
        alias: impl Into<String>,
        model: impl Into<String>,
        collection: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            model: model.into(),
            collection: collection.into(),
            kind: AssociationKind::HasMany,
            local_key: ID_FIELD.to_string(),
            foreign_key: foreign_key.into(),
            singular: false,
        }
    }
}

/// Index declared by a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDeclaration {
    /// Explicit name; defaults to the store naming convention
    #[serde(default)]
    pub name: Option<String>,
    /// Indexed fields in key order
    pub fields: Vec<SortSpec>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
}

/// Schema of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Model name
    pub name: String,
    /// Backing collection
    pub collection: String,
    /// Field definitions (`_id` is implicit)
    #[serde(default)]
    pub fields: HashMap<String, FieldDef>,
    /// Associations reachable from this model
    #[serde(default)]
    pub associations: Vec<AssociationDescriptor>,
    /// Declared indexes
    #[serde(default)]
    pub indexes: Vec<IndexDeclaration>,
}

impl ModelSchema {
    /// Creates an empty model
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            fields: HashMap::new(),
            associations: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a field
    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Adds an association
    pub fn with_association(mut self, association: AssociationDescriptor) -> Self {
        self.associations.push(association);
        self
    }

    /// Adds an index declaration
    pub fn with_index(mut self, index: IndexDeclaration) -> Self {
        self.indexes.push(index);
        self
    }

    /// Looks up an association by alias
    pub fn get_association(&self, alias: &str) -> Option<&AssociationDescriptor> {
        self.associations.iter().find(|a| a.alias == alias)
    }

    /// Resolves the type of a dotted field path.
    ///
    /// Object fields are descended by name; arrays of objects are descended
    /// through their element type.
    pub fn get_field(&self, path: &str) -> Option<&FieldType> {
        if path == ID_FIELD {
            return Some(
                self.fields
                    .get(ID_FIELD)
                    .map_or(&ID_FIELD_TYPE, |def| &def.field_type),
            );
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = &self.fields.get(first)?.field_type;

        for segment in segments {
            let mut node = current;
            while let FieldType::Array { element_type } = node {
                node = element_type.as_ref();
            }
            match node {
                FieldType::Object { fields } => current = &fields.get(segment)?.field_type,
                _ => return None,
            }
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post_model() -> ModelSchema {
        let mut meta = HashMap::new();
        meta.insert("views".to_string(), FieldDef::optional(FieldType::Int));
        let mut comment = HashMap::new();
        comment.insert("score".to_string(), FieldDef::optional(FieldType::Float));

        ModelSchema::new("Post", "posts")
            .with_field("title", FieldDef::required(FieldType::String))
            .with_field("author_id", FieldDef::optional(FieldType::Id))
            .with_field("meta", FieldDef::optional(FieldType::Object { fields: meta }))
            .with_field(
                "comments",
                FieldDef::optional(FieldType::Array {
                    element_type: Box::new(FieldType::Object { fields: comment }),
                }),
            )
            .with_association(AssociationDescriptor::belongs_to(
                "Author", "Person", "people", "author_id",
            ))
    }

    #[test]
    fn test_get_field_paths() {
        let model = post_model();
        assert_eq!(model.get_field("title"), Some(&FieldType::String));
        assert_eq!(model.get_field("_id"), Some(&FieldType::Id));
        assert_eq!(model.get_field("meta.views"), Some(&FieldType::Int));
        assert_eq!(model.get_field("comments.score"), Some(&FieldType::Float));
        assert_eq!(model.get_field("title.length"), None);
        assert_eq!(model.get_field("missing"), None);
    }

    #[test]
    fn test_association_lookup() {
        let model = post_model();
        let author = model.get_association("Author").unwrap();
        assert_eq!(author.kind, AssociationKind::BelongsTo);
        assert_eq!(author.foreign_key, "_id");
        assert!(author.singular);
        assert!(model.get_association("Editor").is_none());
    }

    #[test]
    fn test_model_from_json() {
        let model: ModelSchema = serde_json::from_value(json!({
            "name": "ProjectVersion",
            "collection": "project_versions",
            "fields": {"version_string": {"type": "string"}},
            "associations": [{
                "alias": "Project", "model": "Project", "collection": "projects",
                "kind": "belongs_to", "local_key": "project_id", "foreign_key": "_id",
                "singular": true
            }],
            "indexes": [{"fields": [{"field": "version_string", "direction": "asc"}], "unique": true}]
        }))
        .unwrap();
        assert_eq!(model.associations.len(), 1);
        assert!(model.indexes[0].unique);
        assert_eq!(model.indexes[0].name, None);
    }
}
