//! In-memory aggregation pipeline evaluation
//!
//! Supports the stages the plan compiler and executor emit:
//! `$match`, `$lookup`, `$unwind`, `$sort`, `$skip`, `$limit`, `$count`,
//! plus `$project` for callers that want it.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::document::{lookup_path, project, remove_field, set_path};
use super::errors::{StoreError, StoreResult};
use super::matcher::FilterMatcher;
use super::sort::{DocumentSorter, SortDirection, SortSpec};

/// Evaluates native pipeline stages over a snapshot of collections
pub(crate) struct PipelineRunner<'a> {
    collections: &'a HashMap<String, Vec<Value>>,
    joins_enabled: bool,
}

impl<'a> PipelineRunner<'a> {
    pub(crate) fn new(collections: &'a HashMap<String, Vec<Value>>, joins_enabled: bool) -> Self {
        Self {
            collections,
            joins_enabled,
        }
    }

    /// Runs `stages` against `collection`
    pub(crate) fn run(&self, collection: &str, stages: &[Value]) -> StoreResult<Vec<Value>> {
        let mut documents: Vec<Value> = self
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();

        for stage in stages {
            documents = self.run_stage(stage, documents)?;
        }
        Ok(documents)
    }

    fn run_stage(&self, stage: &Value, documents: Vec<Value>) -> StoreResult<Vec<Value>> {
        let (name, arg) = match stage.as_object() {
            Some(obj) if obj.len() == 1 => obj
                .iter()
                .next()
                .ok_or_else(|| StoreError::rejected("empty pipeline stage"))?,
            _ => {
                return Err(StoreError::rejected(format!(
                    "pipeline stage must be an object with one key: {}",
                    stage
                )))
            }
        };

        match name.as_str() {
            "$match" => {
                let mut kept = Vec::with_capacity(documents.len());
                for doc in documents {
                    if FilterMatcher::matches(&doc, arg)? {
                        kept.push(doc);
                    }
                }
                Ok(kept)
            }
            "$lookup" => self.lookup(documents, arg),
            "$unwind" => Self::unwind(documents, arg),
            "$sort" => {
                let specs = Self::parse_sort(arg)?;
                let mut documents = documents;
                DocumentSorter::sort(&mut documents, &specs);
                Ok(documents)
            }
            "$skip" => {
                let n = Self::parse_count(name, arg)?;
                Ok(documents.into_iter().skip(n).collect())
            }
            "$limit" => {
                let n = Self::parse_count(name, arg)?;
                Ok(documents.into_iter().take(n).collect())
            }
            "$count" => {
                let field = arg
                    .as_str()
                    .ok_or_else(|| StoreError::rejected("$count requires a field name"))?;
                if documents.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![json!({ field: documents.len() as u64 })])
            }
            "$project" => {
                let fields: Vec<String> = arg
                    .as_object()
                    .ok_or_else(|| StoreError::rejected("$project requires an object"))?
                    .iter()
                    .filter(|(_, v)| v.as_i64() == Some(1) || v.as_bool() == Some(true))
                    .map(|(k, _)| k.clone())
                    .collect();
                Ok(documents.iter().map(|d| project(d, &fields)).collect())
            }
            other => Err(StoreError::rejected(format!("unsupported stage {}", other))),
        }
    }

    fn lookup(&self, documents: Vec<Value>, arg: &Value) -> StoreResult<Vec<Value>> {
        if !self.joins_enabled {
            return Err(StoreError::Unsupported(
                "$lookup is not supported by this store".into(),
            ));
        }

        let from = Self::lookup_arg(arg, "from")?;
        let local_field = Self::lookup_arg(arg, "localField")?;
        let foreign_field = Self::lookup_arg(arg, "foreignField")?;
        let alias = Self::lookup_arg(arg, "as")?;

        let foreign = self.collections.get(from).map(Vec::as_slice).unwrap_or(&[]);

        let mut joined = Vec::with_capacity(documents.len());
        for mut doc in documents {
            let local_values: Vec<Value> =
                lookup_path(&doc, local_field).into_iter().cloned().collect();
            let matches: Vec<Value> = foreign
                .iter()
                .filter(|candidate| {
                    lookup_path(candidate, foreign_field)
                        .into_iter()
                        .any(|fv| local_values.iter().any(|lv| lv == fv))
                })
                .cloned()
                .collect();
            set_path(&mut doc, alias, Value::Array(matches));
            joined.push(doc);
        }
        Ok(joined)
    }

    fn lookup_arg<'v>(arg: &'v Value, key: &str) -> StoreResult<&'v str> {
        arg.get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::rejected(format!("$lookup requires {}", key)))
    }

    fn unwind(documents: Vec<Value>, arg: &Value) -> StoreResult<Vec<Value>> {
        let (path, preserve) = match arg {
            Value::String(path) => (path.as_str(), false),
            Value::Object(obj) => {
                let path = obj
                    .get("path")
                    .and_then(Value::as_str)
                    .ok_or_else(|| StoreError::rejected("$unwind requires path"))?;
                let preserve = obj
                    .get("preserveNullAndEmptyArrays")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                (path, preserve)
            }
            _ => return Err(StoreError::rejected("$unwind must be a string or object")),
        };
        let field = path.strip_prefix('$').unwrap_or(path);

        let mut result = Vec::new();
        for doc in documents {
            let elements = match doc.get(field) {
                Some(Value::Array(items)) => Some(items.clone()),
                Some(Value::Null) | None => Some(Vec::new()),
                Some(_) => None,
            };
            match elements {
                None => result.push(doc),
                Some(items) if items.is_empty() => {
                    if preserve {
                        let mut copy = doc;
                        remove_field(&mut copy, field);
                        result.push(copy);
                    }
                }
                Some(items) => {
                    for item in items {
                        let mut copy = doc.clone();
                        set_path(&mut copy, field, item);
                        result.push(copy);
                    }
                }
            }
        }
        Ok(result)
    }

    fn parse_sort(arg: &Value) -> StoreResult<Vec<SortSpec>> {
        let obj = arg
            .as_object()
            .ok_or_else(|| StoreError::rejected("$sort must be an object"))?;
        obj.iter()
            .map(|(field, dir)| {
                let direction = SortDirection::parse(dir)
                    .ok_or_else(|| StoreError::rejected("sort direction must be 1 or -1"))?;
                Ok(SortSpec {
                    field: field.clone(),
                    direction,
                })
            })
            .collect()
    }

    fn parse_count(name: &str, arg: &Value) -> StoreResult<usize> {
        arg.as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| StoreError::rejected(format!("{} requires a non-negative integer", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> HashMap<String, Vec<Value>> {
        let mut collections = HashMap::new();
        collections.insert(
            "parents".to_string(),
            vec![json!({"_id": "p1", "name": "one"}), json!({"_id": "p2", "name": "two"})],
        );
        collections.insert(
            "children".to_string(),
            vec![
                json!({"_id": "c1", "parent_id": "p1"}),
                json!({"_id": "c2", "parent_id": "p2"}),
                json!({"_id": "c3", "parent_id": null}),
            ],
        );
        collections
    }

    #[test]
    fn test_lookup_unwind_preserve() {
        let collections = fixture();
        let runner = PipelineRunner::new(&collections, true);
        let stages = vec![
            json!({"$lookup": {"from": "parents", "localField": "parent_id", "foreignField": "_id", "as": "Parent"}}),
            json!({"$unwind": {"path": "$Parent", "preserveNullAndEmptyArrays": true}}),
        ];
        let out = runner.run("children", &stages).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0]["Parent"]["name"], json!("one"));
        assert!(out[2].get("Parent").is_none());
    }

    #[test]
    fn test_count_over_zero_rows_is_empty() {
        let collections = fixture();
        let runner = PipelineRunner::new(&collections, true);
        let stages = vec![json!({"$match": {"_id": "none"}}), json!({"$count": "available"})];
        assert!(runner.run("children", &stages).unwrap().is_empty());

        let stages = vec![json!({"$count": "available"})];
        assert_eq!(runner.run("children", &stages).unwrap(), vec![json!({"available": 3})]);
    }

    #[test]
    fn test_lookup_rejected_without_joins() {
        let collections = fixture();
        let runner = PipelineRunner::new(&collections, false);
        let stages = vec![
            json!({"$lookup": {"from": "parents", "localField": "parent_id", "foreignField": "_id", "as": "Parent"}}),
        ];
        assert!(matches!(
            runner.run("children", &stages),
            Err(StoreError::Unsupported(_))
        ));
    }

    #[test]
    fn test_sort_skip_limit() {
        let collections = fixture();
        let runner = PipelineRunner::new(&collections, true);
        let stages = vec![
            json!({"$sort": {"_id": -1}}),
            json!({"$skip": 1}),
            json!({"$limit": 1}),
        ];
        let out = runner.run("children", &stages).unwrap();
        assert_eq!(out, vec![json!({"_id": "c2", "parent_id": "p2"})]);
    }
}
