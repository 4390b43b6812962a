//! Criteria subsystem for aeroquery
//!
//! Boolean filter expressions over a model's fields, built fluently or
//! parsed from a JSON request. Leaves may reach through one association
//! (`Project.name`); the planner decides whether that needs a join.

mod condition;
mod criteria;
mod errors;
mod expression;
mod options;

pub use condition::{Condition, ConditionInput, ConditionKind, Record};
pub use criteria::{Criteria, FieldHandle};
pub use errors::{CriteriaError, CriteriaErrorCode, CriteriaResult, Severity};
pub use expression::{
    ExprId, Expression, ExpressionTree, FieldExpression, Group, GroupKind, MoveTarget,
};
pub use options::Options;
