//! Plan compiler
//!
//! Single pass over the root group. Local conditions collect in a pending
//! buffer; the first reference to an association flushes the buffer into a
//! `$match`, then appends the join. Nested groups must compile to a pure
//! filter.

use std::mem;

use serde_json::{json, Map, Value};

use super::errors::{PlannerError, PlannerResult};
use super::stage::{CompiledPlan, Stage};
use crate::criteria::{
    Condition, Criteria, Expression, ExpressionTree, FieldExpression, Group, GroupKind, Options,
};
use crate::schema::{AssociationKind, ModelSchema};
use crate::store::ID_FIELD;

/// Compiles criteria into native plans
pub struct PlanCompiler;

impl PlanCompiler {
    /// Compiles the criteria filter.
    ///
    /// Without association references the result is always
    /// `CompiledPlan::Filter`; otherwise a pipeline with one join per alias.
    pub fn compile(criteria: &Criteria) -> PlannerResult<CompiledPlan> {
        let tree = criteria.tree();
        let mut state = CompileState {
            model: criteria.model(),
            pending: Vec::new(),
            stages: Vec::new(),
            joined: Vec::new(),
        };

        let Some(root) = tree.group(tree.root()) else {
            return Ok(CompiledPlan::Filter(Value::Object(Map::new())));
        };

        match root.kind {
            GroupKind::And => {
                for item in &root.items {
                    match tree.get(*item) {
                        Some(Expression::Field(field)) => state.push_field(field)?,
                        Some(Expression::Group(group)) => {
                            if let Some(fragment) = compile_nested(tree, group)? {
                                state.pending.push(fragment);
                            }
                        }
                        None => {}
                    }
                }
            }
            GroupKind::Or => {
                if let Some(fragment) = compile_nested(tree, root)? {
                    state.pending.push(fragment);
                }
            }
            GroupKind::Not => return Err(PlannerError::unsupported_group(root.kind.as_str())),
        }

        Ok(state.finish())
    }

    /// Options travel unchanged; they are applied by the executor
    pub fn compile_options(criteria: &Criteria) -> Options {
        criteria.options().clone()
    }
}

struct CompileState<'c> {
    model: &'c ModelSchema,
    pending: Vec<Value>,
    stages: Vec<Stage>,
    joined: Vec<String>,
}

impl CompileState<'_> {
    fn push_field(&mut self, field: &FieldExpression) -> PlannerResult<()> {
        match &field.association {
            None => push_conditions(&mut self.pending, &field.target_path, &field.items),
            Some(alias) => {
                self.join(alias)?;
                let path = field.qualified_path();
                push_conditions(&mut self.pending, &path, &field.items);
            }
        }
        Ok(())
    }

    fn join(&mut self, alias: &str) -> PlannerResult<()> {
        if self.joined.iter().any(|a| a == alias) {
            return Ok(());
        }
        let association = self
            .model
            .get_association(alias)
            .ok_or_else(|| PlannerError::unknown_association(&self.model.name, alias))?;

        self.flush();

        let belongs_to = association.kind == AssociationKind::BelongsTo;
        if belongs_to {
            self.stages.push(Stage::Match(
                json!({ association.local_key.as_str(): { "$ne": null } }),
            ));
        }
        self.stages.push(Stage::Lookup {
            from: association.collection.clone(),
            local_field: association.local_key.clone(),
            foreign_field: association.foreign_key.clone(),
            as_field: alias.to_string(),
        });
        if belongs_to && association.singular {
            self.stages.push(Stage::Unwind {
                path: alias.to_string(),
                preserve_null_and_empty_arrays: false,
            });
        }
        self.joined.push(alias.to_string());
        Ok(())
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let items = mem::take(&mut self.pending);
            self.stages.push(Stage::Match(json!({ "$and": items })));
        }
    }

    fn finish(mut self) -> CompiledPlan {
        if self.joined.is_empty() {
            if self.pending.is_empty() {
                CompiledPlan::Filter(Value::Object(Map::new()))
            } else {
                CompiledPlan::Filter(json!({ "$and": self.pending }))
            }
        } else {
            self.flush();
            CompiledPlan::Pipeline {
                stages: self.stages,
                joined_aliases: self.joined,
            }
        }
    }
}

/// One `{path: fragment}` per condition so conditions on one path never
/// overwrite each other
fn push_conditions(pending: &mut Vec<Value>, path: &str, conditions: &[Condition]) {
    for condition in conditions {
        let mut fragment = Map::new();
        fragment.insert(path.to_string(), condition.to_fragment());
        pending.push(Value::Object(fragment));
    }
}

/// Compiles a nested group into one filter object.
///
/// `None` means the group constrains nothing (an empty `And`).
fn compile_nested(tree: &ExpressionTree, group: &Group) -> PlannerResult<Option<Value>> {
    match group.kind {
        GroupKind::Not => Err(PlannerError::unsupported_group(group.kind.as_str())),
        GroupKind::And => {
            let mut items = Vec::new();
            for child in &group.items {
                items.extend(child_fragments(tree, tree.get(*child))?);
            }
            if items.is_empty() {
                Ok(None)
            } else {
                Ok(Some(json!({ "$and": items })))
            }
        }
        GroupKind::Or => {
            if group.items.is_empty() {
                return Ok(Some(json!({ ID_FIELD: { "$exists": false } })));
            }
            let mut items = Vec::new();
            for child in &group.items {
                let mut fragments = child_fragments(tree, tree.get(*child))?;
                let branch = match fragments.len() {
                    0 => Value::Object(Map::new()),
                    1 => fragments.remove(0),
                    _ => json!({ "$and": fragments }),
                };
                items.push(branch);
            }
            Ok(Some(json!({ "$or": items })))
        }
    }
}

fn child_fragments(tree: &ExpressionTree, child: Option<&Expression>) -> PlannerResult<Vec<Value>> {
    match child {
        Some(Expression::Field(field)) => {
            if let Some(alias) = &field.association {
                return Err(PlannerError::nested_pipeline(alias));
            }
            let mut fragments = Vec::new();
            push_conditions(&mut fragments, &field.target_path, &field.items);
            Ok(fragments)
        }
        Some(Expression::Group(group)) => Ok(compile_nested(tree, group)?.into_iter().collect()),
        None => Ok(Vec::new()),
    }
}
