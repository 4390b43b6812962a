//! Expression arena
//!
//! Every expression lives in one slot of an [`ExpressionTree`] and records
//! its parent id. Groups hold child ids in order. An expression is listed
//! in exactly one group's items (or is the root); moving it updates both
//! sides in one step.

use std::fmt;

use super::condition::Condition;
use super::errors::{CriteriaError, CriteriaResult};

/// Index of an expression in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Boolean combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    And,
    Or,
    Not,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::And => "and",
            GroupKind::Or => "or",
            GroupKind::Not => "not",
        }
    }
}

/// Group of child expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub kind: GroupKind,
    pub items: Vec<ExprId>,
}

/// Leaf condition set on one field, optionally through an association
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpression {
    /// Association alias, when the path starts with one
    pub association: Option<String>,
    /// Path inside the model (or the associated model)
    pub target_path: String,
    pub items: Vec<Condition>,
}

impl FieldExpression {
    /// Builds a leaf from a dotted path.
    ///
    /// A leading segment starting with an uppercase character names an
    /// association when more segments follow.
    pub fn new(path: &str) -> Self {
        let mut field = Self {
            association: None,
            target_path: String::new(),
            items: Vec::new(),
        };
        field.set_target_path(path);
        field
    }

    /// A local leaf with the given conditions
    pub fn local(target_path: impl Into<String>, items: Vec<Condition>) -> Self {
        Self {
            association: None,
            target_path: target_path.into(),
            items,
        }
    }

    pub fn set_target_path(&mut self, path: &str) {
        match path.split_once('.') {
            Some((head, rest))
                if !rest.is_empty() && head.chars().next().map_or(false, char::is_uppercase) =>
            {
                self.association = Some(head.to_string());
                self.target_path = rest.to_string();
            }
            _ => {
                self.association = None;
                self.target_path = path.to_string();
            }
        }
    }

    /// Full path as seen on a joined record (`Alias.path`)
    pub fn qualified_path(&self) -> String {
        match &self.association {
            Some(alias) => format!("{}.{}", alias, self.target_path),
            None => self.target_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Group(Group),
    Field(FieldExpression),
}

#[derive(Debug, Clone)]
struct Slot {
    parent: Option<ExprId>,
    expression: Expression,
}

/// Where to move an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    /// Directly into this group
    Group(ExprId),
    /// Into a group of this kind under the current context
    Kind(GroupKind),
}

/// Arena of expressions rooted at one group
#[derive(Debug, Clone)]
pub struct ExpressionTree {
    slots: Vec<Slot>,
    root: ExprId,
}

impl ExpressionTree {
    pub fn new(kind: GroupKind) -> Self {
        Self {
            slots: vec![Slot {
                parent: None,
                expression: Expression::Group(Group {
                    kind,
                    items: Vec::new(),
                }),
            }],
            root: ExprId(0),
        }
    }

    pub fn root(&self) -> ExprId {
        self.root
    }

    pub fn get(&self, id: ExprId) -> Option<&Expression> {
        self.slots.get(id.0).map(|slot| &slot.expression)
    }

    pub fn parent(&self, id: ExprId) -> Option<ExprId> {
        self.slots.get(id.0).and_then(|slot| slot.parent)
    }

    pub fn group(&self, id: ExprId) -> Option<&Group> {
        match self.get(id) {
            Some(Expression::Group(group)) => Some(group),
            _ => None,
        }
    }

    pub fn field(&self, id: ExprId) -> Option<&FieldExpression> {
        match self.get(id) {
            Some(Expression::Field(field)) => Some(field),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, id: ExprId) -> Option<&mut FieldExpression> {
        match self.slots.get_mut(id.0).map(|slot| &mut slot.expression) {
            Some(Expression::Field(field)) => Some(field),
            _ => None,
        }
    }

    fn group_mut(&mut self, id: ExprId) -> CriteriaResult<&mut Group> {
        match self.slots.get_mut(id.0).map(|slot| &mut slot.expression) {
            Some(Expression::Group(group)) => Ok(group),
            _ => Err(CriteriaError::invalid_move(format!(
                "Expression {} is not a group",
                id
            ))),
        }
    }

    fn check(&self, id: ExprId) -> CriteriaResult<()> {
        if id.0 < self.slots.len() {
            Ok(())
        } else {
            Err(CriteriaError::invalid_move(format!(
                "Expression {} does not belong to this criteria",
                id
            )))
        }
    }

    fn alloc(&mut self, parent: ExprId, expression: Expression) -> CriteriaResult<ExprId> {
        self.group_mut(parent)?;
        let id = ExprId(self.slots.len());
        self.slots.push(Slot {
            parent: Some(parent),
            expression,
        });
        self.group_mut(parent)?.items.push(id);
        Ok(id)
    }

    /// Appends a leaf to `parent`
    pub fn add_field(&mut self, parent: ExprId, field: FieldExpression) -> CriteriaResult<ExprId> {
        self.alloc(parent, Expression::Field(field))
    }

    /// Appends an empty group to `parent`
    pub fn add_group(&mut self, parent: ExprId, kind: GroupKind) -> CriteriaResult<ExprId> {
        self.alloc(
            parent,
            Expression::Group(Group {
                kind,
                items: Vec::new(),
            }),
        )
    }

    /// Position of `id` within its parent's items
    pub fn position(&self, id: ExprId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.group(parent)?.items.iter().position(|item| *item == id)
    }

    /// True if `ancestor` is `id` or lies on its parent chain
    pub fn is_ancestor(&self, ancestor: ExprId, id: ExprId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Reparents `id` to the end of group `target`
    pub fn move_to(&mut self, id: ExprId, target: ExprId) -> CriteriaResult<()> {
        self.check(id)?;
        self.check(target)?;
        if id == self.root {
            return Err(CriteriaError::invalid_move("The root group cannot be moved"));
        }
        if self.is_ancestor(id, target) {
            return Err(CriteriaError::invalid_move(format!(
                "Cannot move {} into itself or a descendant",
                id
            )));
        }
        self.group_mut(target)?;

        self.detach(id)?;
        self.group_mut(target)?.items.push(id);
        self.slots[id.0].parent = Some(target);
        Ok(())
    }

    /// Wraps `id` in a new group of `kind` at the same position
    pub fn wrap(&mut self, id: ExprId, kind: GroupKind) -> CriteriaResult<ExprId> {
        self.check(id)?;
        let parent = self
            .parent(id)
            .ok_or_else(|| CriteriaError::invalid_move("The root group cannot be wrapped"))?;
        let position = self.position(id).unwrap_or(0);

        let group = ExprId(self.slots.len());
        self.slots.push(Slot {
            parent: Some(parent),
            expression: Expression::Group(Group {
                kind,
                items: vec![id],
            }),
        });
        self.group_mut(parent)?.items[position] = group;
        self.slots[id.0].parent = Some(group);
        Ok(group)
    }

    fn detach(&mut self, id: ExprId) -> CriteriaResult<()> {
        if let Some(parent) = self.parent(id) {
            self.group_mut(parent)?.items.retain(|item| *item != id);
        }
        self.slots[id.0].parent = None;
        Ok(())
    }

    /// Replaces the leaf at `id` in place; its group position is unchanged
    pub fn replace_field(&mut self, id: ExprId, field: FieldExpression) -> CriteriaResult<()> {
        match self.field_mut(id) {
            Some(slot) => {
                *slot = field;
                Ok(())
            }
            None => Err(CriteriaError::invalid_move(format!(
                "Expression {} is not a field expression",
                id
            ))),
        }
    }

    /// Leaves reachable from the root, depth first in item order
    pub fn field_ids(&self) -> Vec<ExprId> {
        let mut ids = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.get(id) {
                Some(Expression::Group(group)) => stack.extend(group.items.iter().rev()),
                Some(Expression::Field(_)) => ids.push(id),
                None => {}
            }
        }
        ids
    }
}
