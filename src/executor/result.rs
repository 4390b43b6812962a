//! Result types for query execution

use serde::Serialize;
use serde_json::Value;

/// One page of records plus the total match count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// Records in result order
    pub items: Vec<Value>,
    /// Total matching records regardless of skip/limit; `None` when not requested
    pub available: Option<u64>,
}

impl PageResult {
    pub fn new(items: Vec<Value>, available: Option<u64>) -> Self {
        Self { items, available }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
