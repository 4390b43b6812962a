//! Conditions and their native operator fragments

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

use super::errors::{CriteriaError, CriteriaResult};
use crate::store::ID_FIELD;

/// Closed set of condition kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Equals,
    Ne,
    Not,
    In,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
    Exists,
}

impl ConditionKind {
    /// Every kind, in declaration order
    pub const ALL: [ConditionKind; 10] = [
        ConditionKind::Equals,
        ConditionKind::Ne,
        ConditionKind::Not,
        ConditionKind::In,
        ConditionKind::Contains,
        ConditionKind::Gt,
        ConditionKind::Gte,
        ConditionKind::Lt,
        ConditionKind::Lte,
        ConditionKind::Exists,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Equals => "equals",
            ConditionKind::Ne => "ne",
            ConditionKind::Not => "not",
            ConditionKind::In => "in",
            ConditionKind::Contains => "contains",
            ConditionKind::Gt => "gt",
            ConditionKind::Gte => "gte",
            ConditionKind::Lt => "lt",
            ConditionKind::Lte => "lte",
            ConditionKind::Exists => "exists",
        }
    }
}

impl FromStr for ConditionKind {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" | "eq" => Ok(ConditionKind::Equals),
            other => ConditionKind::ALL
                .iter()
                .copied()
                .find(|kind| kind.as_str() == other)
                .ok_or_else(|| CriteriaError::invalid_kind(other)),
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored record of some model
///
/// Records are what the store hands back. They are never valid condition
/// values; conditions take the record's identifier instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: String,
    document: Value,
}

impl Record {
    pub fn new(model: impl Into<String>, document: Value) -> Self {
        Self {
            model: model.into(),
            document,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The record's `_id`, if assigned
    pub fn id(&self) -> Option<&Value> {
        self.document.get(ID_FIELD)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }
}

/// Value handed to a condition builder
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionInput {
    /// Plain JSON value
    Value(Value),
    /// A stored record; always rejected
    Record(Record),
}

impl ConditionInput {
    /// Unwraps a plain value, rejecting records
    pub fn into_value(self, path: &str) -> CriteriaResult<Value> {
        match self {
            ConditionInput::Value(value) => Ok(value),
            ConditionInput::Record(record) => {
                Err(CriteriaError::domain_object(path, record.model()))
            }
        }
    }
}

impl From<Value> for ConditionInput {
    fn from(value: Value) -> Self {
        ConditionInput::Value(value)
    }
}

impl From<&str> for ConditionInput {
    fn from(value: &str) -> Self {
        ConditionInput::Value(Value::from(value))
    }
}

impl From<String> for ConditionInput {
    fn from(value: String) -> Self {
        ConditionInput::Value(Value::from(value))
    }
}

impl From<i64> for ConditionInput {
    fn from(value: i64) -> Self {
        ConditionInput::Value(Value::from(value))
    }
}

impl From<i32> for ConditionInput {
    fn from(value: i32) -> Self {
        ConditionInput::Value(Value::from(value))
    }
}

impl From<u64> for ConditionInput {
    fn from(value: u64) -> Self {
        ConditionInput::Value(Value::from(value))
    }
}

impl From<f64> for ConditionInput {
    fn from(value: f64) -> Self {
        ConditionInput::Value(Value::from(value))
    }
}

impl From<bool> for ConditionInput {
    fn from(value: bool) -> Self {
        ConditionInput::Value(Value::Bool(value))
    }
}

impl From<Vec<Value>> for ConditionInput {
    fn from(values: Vec<Value>) -> Self {
        ConditionInput::Value(Value::Array(values))
    }
}

impl From<Vec<&str>> for ConditionInput {
    fn from(values: Vec<&str>) -> Self {
        ConditionInput::Value(Value::from(values))
    }
}

impl From<Vec<String>> for ConditionInput {
    fn from(values: Vec<String>) -> Self {
        ConditionInput::Value(Value::from(values))
    }
}

impl From<Vec<i64>> for ConditionInput {
    fn from(values: Vec<i64>) -> Self {
        ConditionInput::Value(Value::from(values))
    }
}

impl From<Record> for ConditionInput {
    fn from(record: Record) -> Self {
        ConditionInput::Record(record)
    }
}

impl From<&Record> for ConditionInput {
    fn from(record: &Record) -> Self {
        ConditionInput::Record(record.clone())
    }
}

/// One condition on a field
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub value: Value,
    /// False when the value is already native and must not be cast
    pub cast: bool,
}

impl Condition {
    pub fn new(kind: ConditionKind, value: Value) -> Self {
        Self {
            kind,
            value,
            cast: true,
        }
    }

    /// A condition whose value is already in native form
    pub fn native(kind: ConditionKind, value: Value) -> Self {
        Self {
            kind,
            value,
            cast: false,
        }
    }

    /// Native operator fragment placed under the field path
    pub fn to_fragment(&self) -> Value {
        let value = self.value.clone();
        match self.kind {
            ConditionKind::Equals => value,
            ConditionKind::Ne => json!({ "$ne": value }),
            ConditionKind::Not if is_operator_object(&value) => json!({ "$not": value }),
            ConditionKind::Not => json!({ "$ne": value }),
            ConditionKind::In => match value {
                Value::Array(_) => json!({ "$in": value }),
                scalar => json!({ "$in": [scalar] }),
            },
            ConditionKind::Contains => {
                let needle = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                json!({ "$regex": regex::escape(&needle), "$options": "i" })
            }
            ConditionKind::Gt => json!({ "$gt": value }),
            ConditionKind::Gte => json!({ "$gte": value }),
            ConditionKind::Lt => json!({ "$lt": value }),
            ConditionKind::Lte => json!({ "$lte": value }),
            ConditionKind::Exists => json!({ "$exists": truthy(&value) }),
        }
    }
}

/// `{"$gt": 1, ...}`: a non-empty object keyed only by operators
fn is_operator_object(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty() && map.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

/// Boolean reading of an `exists` value
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "false" | "0"),
        Value::Array(_) | Value::Object(_) => true,
    }
}
