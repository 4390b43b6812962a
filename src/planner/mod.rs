//! Plan compiler subsystem for aeroquery
//!
//! Turns a [`Criteria`](crate::criteria::Criteria) into a
//! [`CompiledPlan`]: a flat native filter when no association is
//! referenced, otherwise an ordered stage pipeline.
//!
//! # Stage order
//!
//! 1. `$match` on local conditions seen before the first join
//! 2. `$match` guard on the local key (belongs-to only)
//! 3. `$lookup` into the alias
//! 4. `$unwind` (singular belongs-to only)
//! 5. `$match` on remaining and joined conditions
//! 6. `$sort` / `$skip` / `$limit` or `$count`, appended by the executor
//!
//! Plans are compiled once per query and never cached.

mod errors;
mod explain;
mod planner;
mod stage;

pub use crate::criteria::Options;
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::ExplainPlan;
pub use planner::PlanCompiler;
pub use stage::{CompiledPlan, Stage, COUNT_FIELD};
