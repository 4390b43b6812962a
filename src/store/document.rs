//! Dotted-path access over JSON documents
//!
//! Arrays met along a path are traversed element-wise, so `tags.name`
//! reaches the `name` of every object inside `tags`.

use serde_json::{Map, Value};

/// Field name of the primary key
pub const ID_FIELD: &str = "_id";

/// Collects every value reachable at `path`.
///
/// A terminal array contributes itself and each of its elements.
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect(document, &segments, &mut out);
    out
}

fn collect<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
        return;
    };

    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(*head) {
                collect(child, rest, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                if item.is_object() {
                    collect(item, segments, out);
                }
            }
        }
        _ => {}
    }
}

/// Returns the value at `path` without array traversal
pub fn first_value<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

/// Inserts `value` at a dotted `path`, creating intermediate objects
pub fn set_path(document: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = document;

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Removes the top-level field `name`
pub fn remove_field(document: &mut Value, name: &str) {
    if let Value::Object(map) = document {
        map.remove(name);
    }
}

/// Keeps only the listed paths (plus `_id`). An empty list keeps everything.
pub fn project(document: &Value, fields: &[String]) -> Value {
    if fields.is_empty() {
        return document.clone();
    }

    let mut projected = Value::Object(Map::new());
    if let Some(id) = document.get(ID_FIELD) {
        set_path(&mut projected, ID_FIELD, id.clone());
    }
    for field in fields {
        if let Some(value) = first_value(document, field) {
            set_path(&mut projected, field, value.clone());
        }
    }
    projected
}
