//! Field type definitions and condition casting
//!
//! Supported types:
//! - id: UUID identifier, stored lower-case hyphenated
//! - string, int, float, bool
//! - date: RFC 3339 timestamp, stored as UTC RFC 3339 with milliseconds
//! - object: nested object with field schema
//! - array: array with element type

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{SchemaError, SchemaResult};

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    /// UUID identifier
    Id,
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Timestamp
    Date,
    /// Nested object with its own field schema
    Object {
        /// Nested field definitions
        fields: HashMap<String, FieldDef>,
    },
    /// Array with a single element type
    Array {
        #[serde(rename = "element_type")]
        element_type: Box<FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Id => "id",
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
        }
    }

    /// Casts a condition value to the native form of this type.
    ///
    /// `null` is preserved. Arrays are cast element-wise; a scalar compared
    /// against an array field is cast with the element type.
    pub fn cast_condition(&self, value: &Value) -> SchemaResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match self {
            FieldType::Array { element_type } => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| element_type.cast_condition(item))
                    .collect::<SchemaResult<Vec<_>>>()
                    .map(Value::Array),
                scalar => element_type.cast_condition(scalar),
            },
            _ => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.cast_scalar(item))
                    .collect::<SchemaResult<Vec<_>>>()
                    .map(Value::Array),
                scalar => self.cast_scalar(scalar),
            },
        }
    }

    fn cast_scalar(&self, value: &Value) -> SchemaResult<Value> {
        let fail = || SchemaError::cast_failed(self.type_name(), value);

        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),

            (FieldType::Id, Value::String(s)) => Uuid::parse_str(s.trim())
                .map(|id| Value::String(id.hyphenated().to_string()))
                .map_err(|_| fail()),

            (FieldType::String, Value::String(_)) => Ok(value.clone()),
            (FieldType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (FieldType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

            (FieldType::Int, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Value::from(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(fail()),
                }
            }
            (FieldType::Int, Value::String(s)) => {
                s.trim().parse::<i64>().map(Value::from).map_err(|_| fail())
            }

            (FieldType::Float, Value::Number(n)) => {
                n.as_f64().map(Value::from).ok_or_else(fail)
            }
            (FieldType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from)
                .ok_or_else(fail),

            (FieldType::Bool, Value::Bool(_)) => Ok(value.clone()),
            (FieldType::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            (FieldType::Bool, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(fail()),
            },

            (FieldType::Date, Value::String(s)) => parse_date(s.trim())
                .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
                .ok_or_else(fail),
            (FieldType::Date, Value::Number(n)) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
                .ok_or_else(fail),

            (FieldType::Object { .. }, Value::Object(_)) => Ok(value.clone()),

            _ => Err(fail()),
        }
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether field must be present
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
        }
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
        }
    }
}
