//! Observable query lifecycle events

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Compilation
    /// Criteria compiled to a plan
    CriteriaCompiled,
    /// Association leaf rewritten into a local `in` condition
    AssociationResolved,

    // Execution
    /// Page and count returned
    QueryExecuted,
    /// Store rejected the plan
    QueryFailed,

    // Indexes
    /// Index created on first attempt
    IndexCreated,
    /// Conflicting index dropped and recreated
    IndexRecreated,
    /// Recreate after drop still conflicted
    IndexConflict,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CriteriaCompiled => "CRITERIA_COMPILED",
            Event::AssociationResolved => "ASSOCIATION_RESOLVED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::QueryFailed => "QUERY_FAILED",
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexRecreated => "INDEX_RECREATED",
            Event::IndexConflict => "INDEX_CONFLICT",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::CriteriaCompiled | Event::AssociationResolved => Severity::Trace,
            Event::QueryExecuted | Event::IndexCreated => Severity::Info,
            Event::IndexRecreated => Severity::Warn,
            Event::QueryFailed | Event::IndexConflict => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
