//! Native filter evaluation
//!
//! Evaluates filter objects of the form produced by the plan compiler:
//! `{"$and": [...]}`, `{"$or": [...]}` and `{path: value | {$op: arg}}`.
//!
//! Equality against `null` also matches a missing field, so
//! `{"k": {"$ne": null}}` requires `k` to be present and non-null.

use std::cmp::Ordering;

use regex::RegexBuilder;
use serde_json::{Map, Value};

use super::document::lookup_path;
use super::errors::{StoreError, StoreResult};

/// Evaluates native filters against documents
pub struct FilterMatcher;

impl FilterMatcher {
    /// Checks if a document matches a filter object
    pub fn matches(document: &Value, filter: &Value) -> StoreResult<bool> {
        let clauses = filter
            .as_object()
            .ok_or_else(|| StoreError::rejected(format!("filter must be an object: {}", filter)))?;
        Self::matches_clauses(document, clauses)
    }

    fn matches_clauses(document: &Value, clauses: &Map<String, Value>) -> StoreResult<bool> {
        for (key, condition) in clauses {
            let matched = match key.as_str() {
                "$and" => {
                    let items = Self::clause_list(key, condition)?;
                    let mut all = true;
                    for item in items {
                        if !Self::matches(document, item)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                "$or" => {
                    let items = Self::clause_list(key, condition)?;
                    let mut any = false;
                    for item in items {
                        if Self::matches(document, item)? {
                            any = true;
                            break;
                        }
                    }
                    any
                }
                op if op.starts_with('$') => {
                    return Err(StoreError::rejected(format!("unknown top-level operator {}", op)));
                }
                path => {
                    let candidates = lookup_path(document, path);
                    Self::matches_condition(&candidates, condition)?
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn clause_list<'a>(key: &str, value: &'a Value) -> StoreResult<&'a Vec<Value>> {
        value
            .as_array()
            .ok_or_else(|| StoreError::rejected(format!("{} requires an array", key)))
    }

    fn is_operator_object(value: &Value) -> bool {
        match value {
            Value::Object(map) => !map.is_empty() && map.keys().all(|k| k.starts_with('$')),
            _ => false,
        }
    }

    fn matches_condition(candidates: &[&Value], condition: &Value) -> StoreResult<bool> {
        if !Self::is_operator_object(condition) {
            return Ok(Self::eq(candidates, condition));
        }

        let Value::Object(operators) = condition else {
            return Ok(false);
        };

        let options = operators.get("$options").and_then(Value::as_str).unwrap_or("");

        for (op, arg) in operators {
            let matched = match op.as_str() {
                "$eq" => Self::eq(candidates, arg),
                "$ne" => !Self::eq(candidates, arg),
                "$in" => Self::in_list(candidates, arg)?,
                "$nin" => !Self::in_list(candidates, arg)?,
                "$gt" => Self::compare(candidates, arg, |o| o == Ordering::Greater),
                "$gte" => Self::compare(candidates, arg, |o| o != Ordering::Less),
                "$lt" => Self::compare(candidates, arg, |o| o == Ordering::Less),
                "$lte" => Self::compare(candidates, arg, |o| o != Ordering::Greater),
                "$exists" => {
                    let wanted = arg.as_bool().unwrap_or(true);
                    candidates.is_empty() != wanted
                }
                "$regex" => Self::regex(candidates, arg, options)?,
                "$options" => true,
                "$not" => !Self::matches_condition(candidates, arg)?,
                other => {
                    return Err(StoreError::rejected(format!("unknown operator {}", other)));
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn eq(candidates: &[&Value], expected: &Value) -> bool {
        if expected.is_null() && candidates.is_empty() {
            return true;
        }
        candidates.iter().any(|c| *c == expected)
    }

    fn in_list(candidates: &[&Value], list: &Value) -> StoreResult<bool> {
        let items = list
            .as_array()
            .ok_or_else(|| StoreError::rejected("$in requires an array"))?;
        Ok(items.iter().any(|item| Self::eq(candidates, item)))
    }

    fn compare(candidates: &[&Value], bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
        candidates
            .iter()
            .filter_map(|c| compare_same_type(c, bound))
            .any(accept)
    }

    fn regex(candidates: &[&Value], pattern: &Value, options: &str) -> StoreResult<bool> {
        let pattern = pattern
            .as_str()
            .ok_or_else(|| StoreError::rejected("$regex requires a string"))?;
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(options.contains('i'))
            .multi_line(options.contains('m'))
            .build()
            .map_err(|e| StoreError::rejected(format!("invalid $regex: {}", e)))?;
        Ok(candidates
            .iter()
            .filter_map(|c| c.as_str())
            .any(|s| regex.is_match(s)))
    }
}

/// Orders two values of the same JSON type; `None` if not comparable
fn compare_same_type(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
