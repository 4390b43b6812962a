//! Criteria builder
//!
//! A [`Criteria`] owns one expression tree for one model. Conditions are
//! appended under the current context group; `and()`, `or()` and `not()`
//! regroup the most recent expression so that
//! `where(x).or().where(y)` reads the way it is written.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::condition::{truthy, Condition, ConditionInput, ConditionKind};
use super::errors::{CriteriaError, CriteriaResult};
use super::expression::{
    Expression, ExprId, ExpressionTree, FieldExpression, GroupKind, MoveTarget,
};
use super::options::Options;
use crate::schema::{Catalog, FieldType, ModelSchema};
use crate::store::{FilterMatcher, SortDirection, SortSpec};

/// Filter, options and population requests for one query
#[derive(Debug, Clone)]
pub struct Criteria {
    catalog: Arc<Catalog>,
    model: Arc<ModelSchema>,
    tree: ExpressionTree,
    context: ExprId,
    last: Option<ExprId>,
    options: Options,
    populate: Vec<String>,
    want_available: bool,
}

impl Criteria {
    /// Creates an empty criteria for a catalog model
    pub fn new(catalog: Arc<Catalog>, model: &str) -> CriteriaResult<Self> {
        let model = catalog
            .model(model)
            .ok_or_else(|| CriteriaError::unknown_model(model))?;
        let tree = ExpressionTree::new(GroupKind::And);
        Ok(Self {
            context: tree.root(),
            catalog,
            model,
            tree,
            last: None,
            options: Options::default(),
            populate: Vec::new(),
            want_available: true,
        })
    }

    /// Parses the JSON request form.
    ///
    /// ```json
    /// {"where": {"Project.name": "protoblast", "age": {"gte": 18},
    ///            "or": [{"a": 1}, {"b": 2}]},
    ///  "sort": {"age": -1}, "skip": 0, "limit": 10,
    ///  "populate": ["Project"], "available": true}
    /// ```
    ///
    /// An object value under a path is a map of condition kinds; anything
    /// else is an equality.
    pub fn from_request(catalog: Arc<Catalog>, model: &str, request: &Value) -> CriteriaResult<Self> {
        if !request.is_object() {
            return Err(CriteriaError::invalid_request("Request must be a JSON object"));
        }

        let mut criteria = Self::new(catalog, model)?;
        if let Some(clause) = request.get("where") {
            let root = criteria.tree.root();
            criteria.parse_clause(root, clause)?;
        }

        criteria.options = Options::from_request(request)?;

        match request.get("populate") {
            None | Some(Value::Null) => {}
            Some(Value::String(alias)) => {
                criteria.populate(alias)?;
            }
            Some(Value::Array(aliases)) => {
                for alias in aliases {
                    let alias = alias.as_str().ok_or_else(|| {
                        CriteriaError::invalid_request(format!("Invalid populate alias {}", alias))
                    })?;
                    criteria.populate(alias)?;
                }
            }
            Some(other) => {
                return Err(CriteriaError::invalid_request(format!(
                    "Invalid populate {}",
                    other
                )))
            }
        }

        if let Some(available) = request.get("available") {
            criteria.want_available = available.as_bool().ok_or_else(|| {
                CriteriaError::invalid_request("'available' must be a boolean")
            })?;
        }
        Ok(criteria)
    }

    fn parse_clause(&mut self, parent: ExprId, clause: &Value) -> CriteriaResult<()> {
        let map = clause.as_object().ok_or_else(|| {
            CriteriaError::invalid_request(format!("Where clause must be an object, got {}", clause))
        })?;

        for (key, value) in map {
            match key.as_str() {
                "and" | "or" => {
                    let kind = if key == "and" { GroupKind::And } else { GroupKind::Or };
                    let group = self.tree.add_group(parent, kind)?;
                    match value {
                        Value::Array(clauses) => {
                            for clause in clauses {
                                self.parse_clause(group, clause)?;
                            }
                        }
                        other => self.parse_clause(group, other)?,
                    }
                }
                "not" => {
                    let group = self.tree.add_group(parent, GroupKind::Not)?;
                    self.parse_clause(group, value)?;
                }
                path => {
                    let conditions = parse_conditions(path, value)?;
                    self.tree
                        .add_field(parent, FieldExpression {
                            items: conditions,
                            ..FieldExpression::new(path)
                        })?;
                }
            }
        }
        Ok(())
    }

    pub fn model(&self) -> &Arc<ModelSchema> {
        &self.model
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn tree(&self) -> &ExpressionTree {
        &self.tree
    }

    /// Group new expressions are added to
    pub fn context(&self) -> ExprId {
        self.context
    }

    /// Starts a condition on `path` under the current context
    pub fn where_path(&mut self, path: &str) -> FieldHandle<'_> {
        FieldHandle {
            criteria: self,
            path: path.to_string(),
            id: None,
        }
    }

    /// Appends a condition to an existing leaf
    pub fn add_condition(
        &mut self,
        id: ExprId,
        kind: ConditionKind,
        value: impl Into<ConditionInput>,
    ) -> CriteriaResult<()> {
        let path = self
            .tree
            .field(id)
            .map(FieldExpression::qualified_path)
            .ok_or_else(|| CriteriaError::invalid_request(format!("{} is not a field", id)))?;
        let value = value.into().into_value(&path)?;
        self.push_condition(id, Condition::new(kind, value))
    }

    fn push_condition(&mut self, id: ExprId, condition: Condition) -> CriteriaResult<()> {
        let field = self
            .tree
            .field_mut(id)
            .ok_or_else(|| CriteriaError::invalid_request(format!("{} is not a field", id)))?;
        field.items.push(condition);
        Ok(())
    }

    fn add_field(&mut self, path: &str) -> CriteriaResult<ExprId> {
        let id = self.tree.add_field(self.context, FieldExpression::new(path))?;
        self.last = Some(id);
        Ok(id)
    }

    /// Moves an expression into a group.
    ///
    /// `MoveTarget::Kind` reuses the current context when it already has
    /// that kind, otherwise creates a new child group of the context.
    /// Returns the receiving group.
    pub fn move_to_group(&mut self, id: ExprId, target: MoveTarget) -> CriteriaResult<ExprId> {
        let group = match target {
            MoveTarget::Group(group) => group,
            MoveTarget::Kind(kind) => self.find_or_create_group(kind)?,
        };
        self.tree.move_to(id, group)?;
        Ok(group)
    }

    fn find_or_create_group(&mut self, kind: GroupKind) -> CriteriaResult<ExprId> {
        match self.tree.group(self.context) {
            Some(group) if group.kind == kind => Ok(self.context),
            _ => Ok(self.tree.add_group(self.context, kind)?),
        }
    }

    fn combine(&mut self, kind: GroupKind) -> CriteriaResult<&mut Self> {
        let group = match self.last {
            Some(last) if self.tree.group(self.context).map(|g| g.kind) != Some(kind) => {
                self.move_to_group(last, MoveTarget::Kind(kind))?
            }
            Some(_) => self.context,
            None => self.find_or_create_group(kind)?,
        };
        self.context = group;
        Ok(self)
    }

    /// Conjunction with the previous expression
    pub fn and(&mut self) -> CriteriaResult<&mut Self> {
        self.combine(GroupKind::And)
    }

    /// Disjunction with the previous expression
    pub fn or(&mut self) -> CriteriaResult<&mut Self> {
        self.combine(GroupKind::Or)
    }

    /// Negates the previous expression
    pub fn not(&mut self) -> CriteriaResult<&mut Self> {
        let last = self
            .last
            .ok_or_else(|| CriteriaError::invalid_move("Nothing to negate"))?;
        self.last = Some(self.tree.wrap(last, GroupKind::Not)?);
        Ok(self)
    }

    /// Opens an explicit nested group under the current context
    pub fn group(&mut self, kind: GroupKind) -> CriteriaResult<&mut Self> {
        self.context = self.tree.add_group(self.context, kind)?;
        self.last = None;
        Ok(self)
    }

    /// Leaves the current group
    pub fn close(&mut self) -> &mut Self {
        if let Some(parent) = self.tree.parent(self.context) {
            self.last = Some(self.context);
            self.context = parent;
        }
        self
    }

    /// Replaces a leaf in place, keeping its group position
    pub fn replace(&mut self, id: ExprId, field: FieldExpression) -> CriteriaResult<()> {
        self.tree.replace_field(id, field)
    }

    /// Changes the path of a leaf, re-splitting the association alias
    pub fn set_target_path(&mut self, id: ExprId, path: &str) -> CriteriaResult<()> {
        let field = self
            .tree
            .field_mut(id)
            .ok_or_else(|| CriteriaError::invalid_request(format!("{} is not a field", id)))?;
        field.set_target_path(path);
        Ok(())
    }

    /// Leaves that reach through an association
    pub fn association_fields(&self) -> Vec<ExprId> {
        self.tree
            .field_ids()
            .into_iter()
            .filter(|id| {
                self.tree
                    .field(*id)
                    .map_or(false, |field| field.association.is_some())
            })
            .collect()
    }

    /// Casts every castable condition value through its field type.
    ///
    /// Fields the schema does not declare are left as given.
    pub fn normalize(&mut self) -> CriteriaResult<()> {
        for id in self.tree.field_ids() {
            let Some(field) = self.tree.field(id) else {
                continue;
            };
            let model = match &field.association {
                None => Some(self.model.clone()),
                Some(alias) => self
                    .model
                    .get_association(alias)
                    .and_then(|association| self.catalog.model(&association.model)),
            };
            let Some(field_type) = model.and_then(|m| m.get_field(&field.target_path).cloned())
            else {
                continue;
            };
            let path = field.qualified_path();

            if let Some(field) = self.tree.field_mut(id) {
                for condition in field.items.iter_mut().filter(|c| c.cast) {
                    condition.value = cast_condition_value(&field_type, condition, &path)?;
                }
            }
        }
        Ok(())
    }

    /// Evaluates the tree against a document in process.
    ///
    /// Empty `And` is true, empty `Or` is false, `Not` negates the
    /// conjunction of its items. Association leaves read the joined field.
    pub fn matches(&self, document: &Value) -> CriteriaResult<bool> {
        self.evaluate(self.tree.root(), document)
    }

    fn evaluate(&self, id: ExprId, document: &Value) -> CriteriaResult<bool> {
        match self.tree.get(id) {
            Some(Expression::Group(group)) => match group.kind {
                GroupKind::And => {
                    for item in &group.items {
                        if !self.evaluate(*item, document)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                GroupKind::Or => {
                    for item in &group.items {
                        if self.evaluate(*item, document)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                GroupKind::Not => {
                    for item in &group.items {
                        if !self.evaluate(*item, document)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
            },
            Some(Expression::Field(field)) => {
                let path = field.qualified_path();
                for condition in &field.items {
                    let mut filter = Map::new();
                    filter.insert(path.clone(), condition.to_fragment());
                    let matched = FilterMatcher::matches(document, &Value::Object(filter))
                        .map_err(|e| CriteriaError::invalid_request(e.to_string()))?;
                    if !matched {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Options

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort(&mut self, field: impl Into<String>, direction: SortDirection) -> &mut Self {
        self.options.sort.push(SortSpec {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn skip(&mut self, skip: u64) -> &mut Self {
        self.options.skip = skip;
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.options.limit = Some(limit);
        self
    }

    /// Requests that an association be attached to each returned record
    pub fn populate(&mut self, alias: &str) -> CriteriaResult<&mut Self> {
        if self.model.get_association(alias).is_none() {
            return Err(CriteriaError::invalid_request(format!(
                "Model '{}' has no association '{}'",
                self.model.name, alias
            )));
        }
        if !self.populate.iter().any(|a| a == alias) {
            self.populate.push(alias.to_string());
        }
        Ok(self)
    }

    pub fn populated(&self) -> &[String] {
        &self.populate
    }

    /// Whether the total count should be computed
    pub fn available(&mut self, want: bool) -> &mut Self {
        self.want_available = want;
        self
    }

    pub fn wants_available(&self) -> bool {
        self.want_available
    }
}

fn parse_conditions(path: &str, value: &Value) -> CriteriaResult<Vec<Condition>> {
    match value {
        Value::Object(map) => {
            if map.is_empty() {
                return Err(CriteriaError::invalid_request(format!(
                    "Empty condition set for '{}'",
                    path
                )));
            }
            map.iter()
                .map(|(kind, value)| Ok(Condition::new(kind.parse()?, value.clone())))
                .collect()
        }
        other => Ok(vec![Condition::new(ConditionKind::Equals, other.clone())]),
    }
}

fn cast_condition_value(
    field_type: &FieldType,
    condition: &Condition,
    path: &str,
) -> CriteriaResult<Value> {
    let cast = |value: &Value| {
        field_type
            .cast_condition(value)
            .map_err(|e| CriteriaError::cast_failed(path, &e))
    };

    match (condition.kind, &condition.value) {
        (ConditionKind::Exists, value) => Ok(Value::Bool(truthy(value))),
        (ConditionKind::Contains, Value::String(_)) => Ok(condition.value.clone()),
        (ConditionKind::Contains, other) => Ok(Value::String(other.to_string())),
        (ConditionKind::In, Value::Array(_)) => cast(&condition.value),
        (ConditionKind::In, scalar) => cast(&Value::Array(vec![scalar.clone()])),
        // An object under `not` is an operator set, not a value
        (ConditionKind::Not, Value::Object(_)) => Ok(condition.value.clone()),
        (_, value) => cast(value),
    }
}

/// Builder for conditions on one path
///
/// The leaf is created with its first condition, so a handle that never
/// receives one leaves the tree untouched.
pub struct FieldHandle<'a> {
    criteria: &'a mut Criteria,
    path: String,
    id: Option<ExprId>,
}

impl<'a> FieldHandle<'a> {
    /// Adds a condition and keeps building on the same leaf
    pub fn condition(
        mut self,
        kind: ConditionKind,
        value: impl Into<ConditionInput>,
    ) -> CriteriaResult<Self> {
        let value = value.into().into_value(&self.path)?;
        let id = match self.id {
            Some(id) => id,
            None => {
                let id = self.criteria.add_field(&self.path)?;
                self.id = Some(id);
                id
            }
        };
        self.criteria.push_condition(id, Condition::new(kind, value))?;
        Ok(self)
    }

    /// Id of the leaf, once a condition was added
    pub fn id(&self) -> Option<ExprId> {
        self.id
    }

    pub fn done(self) -> &'a mut Criteria {
        self.criteria
    }

    pub fn equals(self, value: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Equals, value).map(Self::done)
    }

    pub fn ne(self, value: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Ne, value).map(Self::done)
    }

    pub fn not(self, value: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Not, value).map(Self::done)
    }

    pub fn in_list(self, values: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::In, values).map(Self::done)
    }

    /// Case-insensitive substring match
    pub fn contains(self, value: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Contains, value).map(Self::done)
    }

    pub fn gt(self, value: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Gt, value).map(Self::done)
    }

    pub fn gte(self, value: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Gte, value).map(Self::done)
    }

    pub fn lt(self, value: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Lt, value).map(Self::done)
    }

    pub fn lte(self, value: impl Into<ConditionInput>) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Lte, value).map(Self::done)
    }

    pub fn exists(self, present: bool) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Exists, present).map(Self::done)
    }

    /// Inclusive range on the same leaf
    pub fn between(
        self,
        low: impl Into<ConditionInput>,
        high: impl Into<ConditionInput>,
    ) -> CriteriaResult<&'a mut Criteria> {
        self.condition(ConditionKind::Gte, low)?
            .condition(ConditionKind::Lte, high)
            .map(Self::done)
    }
}
