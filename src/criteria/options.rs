//! Query options: projection, sort, skip, limit

use serde_json::Value;

use super::errors::{CriteriaError, CriteriaResult};
use crate::store::{FindOptions, SortDirection, SortSpec};

/// Options recognized from a request
const PROJECTION_KEYS: [&str; 2] = ["select", "projection"];

/// Pagination and shaping options, independent of plan mode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    /// Fields to return (empty returns all)
    pub projection: Vec<String>,
    pub sort: Vec<SortSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Options {
    /// Copies the recognized option keys out of a request; others are dropped.
    ///
    /// Sort accepts `{"field": 1}`, `[["field", "desc"]]` or `["field", "-other"]`.
    pub fn from_request(request: &Value) -> CriteriaResult<Self> {
        let mut options = Options::default();

        if let Some(projection) = PROJECTION_KEYS.iter().find_map(|key| request.get(*key)) {
            options.projection = parse_projection(projection)?;
        }
        if let Some(sort) = request.get("sort") {
            options.sort = parse_sort(sort)?;
        }
        if let Some(skip) = request.get("skip") {
            options.skip = parse_count("skip", skip)?;
        }
        if let Some(limit) = request.get("limit") {
            options.limit = match limit {
                Value::Null => None,
                other => Some(parse_count("limit", other)?),
            };
        }
        Ok(options)
    }

    /// Store-level find options
    pub fn to_find_options(&self) -> FindOptions {
        FindOptions {
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
        }
    }
}

fn parse_count(key: &str, value: &Value) -> CriteriaResult<u64> {
    value.as_u64().ok_or_else(|| {
        CriteriaError::invalid_request(format!(
            "'{}' must be a non-negative integer, got {}",
            key, value
        ))
    })
}

fn parse_projection(value: &Value) -> CriteriaResult<Vec<String>> {
    match value {
        Value::String(field) => Ok(vec![field.clone()]),
        Value::Array(fields) => fields
            .iter()
            .map(|field| {
                field.as_str().map(str::to_string).ok_or_else(|| {
                    CriteriaError::invalid_request(format!("Invalid projection field {}", field))
                })
            })
            .collect(),
        other => Err(CriteriaError::invalid_request(format!(
            "Invalid projection {}",
            other
        ))),
    }
}

fn parse_direction(field: &str, value: &Value) -> CriteriaResult<SortSpec> {
    let direction = SortDirection::parse(value).ok_or_else(|| {
        CriteriaError::invalid_request(format!("Invalid sort direction {} for '{}'", value, field))
    })?;
    Ok(SortSpec {
        field: field.to_string(),
        direction,
    })
}

fn parse_sort(value: &Value) -> CriteriaResult<Vec<SortSpec>> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(field, direction)| parse_direction(field, direction))
            .collect(),
        Value::Array(entries) => entries.iter().map(parse_sort_entry).collect(),
        Value::String(_) => parse_sort_entry(value).map(|spec| vec![spec]),
        other => Err(CriteriaError::invalid_request(format!("Invalid sort {}", other))),
    }
}

fn parse_sort_entry(entry: &Value) -> CriteriaResult<SortSpec> {
    match entry {
        Value::String(field) => Ok(match field.strip_prefix('-') {
            Some(rest) => SortSpec::desc(rest),
            None => SortSpec::asc(field.as_str()),
        }),
        Value::Array(pair) if pair.len() == 2 => match &pair[0] {
            Value::String(field) => parse_direction(field, &pair[1]),
            other => Err(CriteriaError::invalid_request(format!(
                "Invalid sort field {}",
                other
            ))),
        },
        other => Err(CriteriaError::invalid_request(format!(
            "Invalid sort entry {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recognized_keys_only() {
        let options = Options::from_request(&json!({
            "select": ["name"],
            "sort": {"name": 1, "age": -1},
            "skip": 10,
            "limit": 5,
            "hint": "name_1",
            "maxTimeMS": 10
        }))
        .unwrap();

        assert_eq!(options.projection, vec!["name".to_string()]);
        assert_eq!(options.sort, vec![SortSpec::asc("name"), SortSpec::desc("age")]);
        assert_eq!(options.skip, 10);
        assert_eq!(options.limit, Some(5));
    }

    #[test]
    fn test_sort_forms() {
        let options =
            Options::from_request(&json!({"sort": [["a", "desc"], "b", "-c"]})).unwrap();
        assert_eq!(
            options.sort,
            vec![SortSpec::desc("a"), SortSpec::asc("b"), SortSpec::desc("c")]
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Options::from_request(&json!({"skip": -1})).is_err());
        assert!(Options::from_request(&json!({"limit": "ten"})).is_err());
        assert!(Options::from_request(&json!({"sort": {"a": "sideways"}})).is_err());
        assert_eq!(Options::from_request(&json!({})).unwrap(), Options::default());
    }
}
