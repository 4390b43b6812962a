//! Schema subsystem for aeroquery
//!
//! Supplies the model metadata the criteria core consumes: field types
//! with their cast functions, association descriptors and index
//! declarations. Schemas are read-only once loaded.

mod catalog;
mod errors;
mod model;
mod types;

pub use catalog::Catalog;
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use model::{AssociationDescriptor, AssociationKind, IndexDeclaration, ModelSchema};
pub use types::{FieldDef, FieldType};
