//! Sort specifications and document ordering
//!
//! Ordering across types: missing < null < bool < number < string < array < object.
//! Sorting is stable, so ties keep insertion order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::first_value;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Native direction number (`1` / `-1`)
    pub fn as_native(&self) -> i64 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }

    /// Parses `asc`/`desc`/`1`/`-1`
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "asc" | "ascending" | "1" => Some(SortDirection::Asc),
                "desc" | "descending" | "-1" => Some(SortDirection::Desc),
                _ => None,
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(SortDirection::Asc),
                Some(-1) => Some(SortDirection::Desc),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field path to sort by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Sorts documents by a list of sort specifications
pub struct DocumentSorter;

impl DocumentSorter {
    /// Sorts documents in place. Earlier specs take precedence.
    pub fn sort(documents: &mut [Value], specs: &[SortSpec]) {
        if specs.is_empty() {
            return;
        }

        documents.sort_by(|a, b| {
            for spec in specs {
                let ordering =
                    compare_values(first_value(a, &spec.field), first_value(b, &spec.field));
                let ordering = match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over optional JSON values used for sorting
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let rank = type_rank(a_val).cmp(&type_rank(b_val));
            if rank != Ordering::Equal {
                return rank;
            }
            match (a_val, b_val) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => {
                    let x = x.as_f64().unwrap_or(0.0);
                    let y = y.as_f64().unwrap_or(0.0);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
                (Value::String(x), Value::String(y)) => x.cmp(y),
                _ => Ordering::Equal,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_direction() {
        assert_eq!(SortDirection::parse(&json!("asc")), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse(&json!(-1)), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse(&json!("sideways")), None);
    }

    #[test]
    fn test_multi_key_sort() {
        let mut docs = vec![
            json!({"n": "b", "v": 1}),
            json!({"n": "a", "v": 2}),
            json!({"n": "a", "v": 1}),
        ];
        DocumentSorter::sort(&mut docs, &[SortSpec::asc("n"), SortSpec::desc("v")]);
        assert_eq!(docs[0], json!({"n": "a", "v": 2}));
        assert_eq!(docs[1], json!({"n": "a", "v": 1}));
        assert_eq!(docs[2], json!({"n": "b", "v": 1}));
    }

    #[test]
    fn test_missing_sorts_first() {
        let mut docs = vec![json!({"v": 1}), json!({})];
        DocumentSorter::sort(&mut docs, &[SortSpec::asc("v")]);
        assert_eq!(docs[0], json!({}));
    }
}
