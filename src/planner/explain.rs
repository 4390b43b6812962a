//! Explain plan output
//!
//! Produces deterministic, human-readable explain output and a JSON form
//! for the CLI.

use std::fmt;

use serde_json::{json, Value};

use super::errors::PlannerError;
use super::stage::CompiledPlan;
use crate::criteria::Options;

/// Explain plan output
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether compilation succeeded
    pub accepted: bool,
    /// `filter` or `pipeline`
    pub mode: Option<String>,
    /// Stage names in order (pipeline mode)
    pub stages: Vec<String>,
    /// Joined association aliases
    pub joins: Vec<String>,
    /// Sort description
    pub sort: Vec<String>,
    pub skip: u64,
    pub limit: Option<u64>,
    /// Native plan
    pub native: Option<Value>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a compiled plan
    pub fn from_plan(plan: &CompiledPlan, options: &Options) -> Self {
        let stages = match plan {
            CompiledPlan::Filter(_) => Vec::new(),
            CompiledPlan::Pipeline { stages, .. } => {
                stages.iter().map(|s| s.name().to_string()).collect()
            }
        };

        Self {
            accepted: true,
            mode: Some(plan.mode().to_string()),
            stages,
            joins: plan.joined_aliases().to_vec(),
            sort: options
                .sort
                .iter()
                .map(|s| format!("{} {}", s.field, s.direction.as_str()))
                .collect(),
            skip: options.skip,
            limit: options.limit,
            native: Some(plan.to_native()),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a compilation error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            mode: None,
            stages: Vec::new(),
            joins: Vec::new(),
            sort: Vec::new(),
            skip: 0,
            limit: None,
            native: None,
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        if self.accepted {
            json!({
                "accepted": true,
                "mode": self.mode,
                "stages": self.stages,
                "joins": self.joins,
                "sort": self.sort,
                "skip": self.skip,
                "limit": self.limit,
                "plan": self.native,
            })
        } else {
            json!({
                "accepted": false,
                "code": self.rejection_code,
                "reason": self.rejection_reason,
            })
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(mode) = &self.mode {
                writeln!(f, "Mode: {}", mode)?;
            }
            if !self.stages.is_empty() {
                writeln!(f, "Stages: {}", self.stages.join(" -> "))?;
            }
            if !self.joins.is_empty() {
                writeln!(f, "Joins: {}", self.joins.join(", "))?;
            }
            if !self.sort.is_empty() {
                writeln!(f, "Sort: {}", self.sort.join(", "))?;
            }
            if self.skip > 0 {
                writeln!(f, "Skip: {}", self.skip)?;
            }
            if let Some(limit) = self.limit {
                writeln!(f, "Limit: {}", limit)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
