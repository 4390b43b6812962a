//! Pipeline stages and compiled plans
//!
//! Native shapes:
//!
//! ```text
//! {"$match": filter}
//! {"$lookup": {"from", "localField", "foreignField", "as"}}
//! {"$unwind": {"path": "$alias", "preserveNullAndEmptyArrays": false}}
//! {"$sort": {field: 1 | -1}}
//! {"$skip": n}
//! {"$limit": n}
//! {"$count": "available"}
//! ```

use serde_json::{json, Map, Value};

use crate::store::SortSpec;

/// Field name `$count` writes the total under
pub const COUNT_FIELD: &str = "available";

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Value),
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    Unwind {
        path: String,
        preserve_null_and_empty_arrays: bool,
    },
    Sort(Vec<SortSpec>),
    Skip(u64),
    Limit(u64),
    Count(String),
}

impl Stage {
    /// Stage operator name
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Lookup { .. } => "$lookup",
            Stage::Unwind { .. } => "$unwind",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
            Stage::Count(_) => "$count",
        }
    }

    pub fn to_native(&self) -> Value {
        match self {
            Stage::Match(filter) => json!({ "$match": filter }),
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => json!({
                "$lookup": {
                    "from": from,
                    "localField": local_field,
                    "foreignField": foreign_field,
                    "as": as_field,
                }
            }),
            Stage::Unwind {
                path,
                preserve_null_and_empty_arrays,
            } => json!({
                "$unwind": {
                    "path": format!("${}", path),
                    "preserveNullAndEmptyArrays": preserve_null_and_empty_arrays,
                }
            }),
            Stage::Sort(specs) => {
                let mut order = Map::new();
                for spec in specs {
                    order.insert(spec.field.clone(), Value::from(spec.direction.as_native()));
                }
                json!({ "$sort": order })
            }
            Stage::Skip(n) => json!({ "$skip": n }),
            Stage::Limit(n) => json!({ "$limit": n }),
            Stage::Count(field) => json!({ "$count": field }),
        }
    }
}

/// Output of compilation
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledPlan {
    /// Single native filter; no joins
    Filter(Value),
    /// Ordered stages; each joined alias appears once
    Pipeline {
        stages: Vec<Stage>,
        joined_aliases: Vec<String>,
    },
}

impl CompiledPlan {
    pub fn is_pipeline(&self) -> bool {
        matches!(self, CompiledPlan::Pipeline { .. })
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CompiledPlan::Filter(_) => "filter",
            CompiledPlan::Pipeline { .. } => "pipeline",
        }
    }

    /// Joined aliases in join order
    pub fn joined_aliases(&self) -> &[String] {
        match self {
            CompiledPlan::Filter(_) => &[],
            CompiledPlan::Pipeline { joined_aliases, .. } => joined_aliases,
        }
    }

    /// The filter object, or the stage list as a JSON array
    pub fn to_native(&self) -> Value {
        match self {
            CompiledPlan::Filter(filter) => filter.clone(),
            CompiledPlan::Pipeline { stages, .. } => {
                Value::Array(stages.iter().map(Stage::to_native).collect())
            }
        }
    }
}
