//! Query engine
//!
//! Runs one criteria end to end: normalize, resolve associations when the
//! store cannot join, compile, execute both branches, populate.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::criteria::{Criteria, CriteriaError, Options, Record};
use crate::executor::{ExecutorError, PageResult, PaginatedExecutor, Populator};
use crate::index::{IndexError, IndexManager};
use crate::observability::{log_event, Event, Timer};
use crate::planner::{CompiledPlan, ExplainPlan, PlanCompiler, PlannerError};
use crate::resolver::{AssociationResolver, ResolverError};
use crate::schema::{Catalog, SchemaError};
use crate::store::{translate_write_error, StoreHandle, WriteError};

/// Result type for engine operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Any failure while running a query
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// Requested page size above the configured maximum
    #[error("Limit {0} exceeds maximum {1}")]
    LimitExceeded(u64, u64),
}

impl QueryError {
    /// Stable `AERO_*` code for the response envelope
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Criteria(e) => e.code().code(),
            QueryError::Resolver(e) => e.code().code(),
            QueryError::Planner(e) => e.code().code(),
            QueryError::Executor(e) => e.code().code(),
            QueryError::Index(e) => e.code().code(),
            QueryError::Schema(e) => e.code().code(),
            QueryError::Write(WriteError::Violation(_)) => "AERO_WRITE_VIOLATION",
            QueryError::Write(WriteError::Store(e)) => e.code(),
            QueryError::LimitExceeded(..) => "AERO_QUERY_LIMIT_EXCEEDED",
        }
    }
}

/// Page size bounds applied before execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryLimits {
    /// Limit used when the criteria sets none
    pub default_limit: Option<u64>,
    /// Largest accepted limit
    pub max_limit: Option<u64>,
}

impl QueryLimits {
    fn apply(&self, options: &mut Options) -> QueryResult<()> {
        if options.limit.is_none() {
            options.limit = self.default_limit.or(self.max_limit);
        }
        match (options.limit, self.max_limit) {
            (Some(limit), Some(max)) if limit > max => Err(QueryError::LimitExceeded(limit, max)),
            _ => Ok(()),
        }
    }
}

/// Query engine over one store and one catalog
pub struct QueryEngine {
    store: StoreHandle,
    catalog: Arc<Catalog>,
    limits: QueryLimits,
}

impl QueryEngine {
    pub fn new(store: StoreHandle, catalog: Arc<Catalog>) -> Self {
        Self {
            store,
            catalog,
            limits: QueryLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Empty criteria for a catalog model
    pub fn criteria(&self, model: &str) -> QueryResult<Criteria> {
        Ok(Criteria::new(self.catalog.clone(), model)?)
    }

    /// Criteria parsed from the JSON request form
    pub fn request(&self, model: &str, request: &Value) -> QueryResult<Criteria> {
        Ok(Criteria::from_request(self.catalog.clone(), model, request)?)
    }

    /// Normalizes, resolves and compiles; the criteria is consumed by the rewrite
    pub async fn prepare(&self, criteria: &mut Criteria) -> QueryResult<(CompiledPlan, Options)> {
        criteria.normalize()?;

        let resolver = AssociationResolver::new(self.store.clone());
        if resolver.is_required() {
            resolver.resolve(criteria).await?;
        }

        let plan = PlanCompiler::compile(criteria)?;
        let mut options = PlanCompiler::compile_options(criteria);
        self.limits.apply(&mut options)?;

        let stages = match &plan {
            CompiledPlan::Filter(_) => 0,
            CompiledPlan::Pipeline { stages, .. } => stages.len(),
        };
        log_event(
            Event::CriteriaCompiled,
            &[
                ("model", criteria.model().name.as_str()),
                ("mode", plan.mode()),
                ("stages", stages.to_string().as_str()),
            ],
        );
        Ok((plan, options))
    }

    /// Returns one page of records and the skip-independent total
    pub async fn find(&self, mut criteria: Criteria) -> QueryResult<PageResult> {
        let (plan, mut options) = self.prepare(&mut criteria).await?;
        let model = criteria.model().clone();

        let selected = options.projection.clone();
        let hidden = Populator::hidden_keys(&model, criteria.populated(), &selected);
        options.projection.extend(hidden.iter().cloned());

        let timer = Timer::new();
        let executor = PaginatedExecutor::new(self.store.clone());
        let mut page = match executor
            .execute(&model.collection, &plan, &options, criteria.wants_available())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                log_event(
                    Event::QueryFailed,
                    &[
                        ("collection", model.collection.as_str()),
                        ("code", e.code().code()),
                        ("duration_ms", timer.elapsed_ms().as_str()),
                    ],
                );
                return Err(e.into());
            }
        };

        let available = page
            .available
            .map(|n| n.to_string())
            .unwrap_or_else(|| "none".to_string());
        log_event(
            Event::QueryExecuted,
            &[
                ("collection", model.collection.as_str()),
                ("mode", plan.mode()),
                ("items", page.len().to_string().as_str()),
                ("available", available.as_str()),
                ("duration_ms", timer.elapsed_ms().as_str()),
            ],
        );

        Populator::new(self.store.clone())
            .populate(&model, &mut page.items, criteria.populated())
            .await?;
        if !hidden.is_empty() {
            Populator::restore_projection(&mut page.items, &selected, criteria.populated());
        }
        Ok(page)
    }

    /// Compiles without executing; compilation failures become a rejected plan
    pub async fn explain(&self, mut criteria: Criteria) -> QueryResult<ExplainPlan> {
        match self.prepare(&mut criteria).await {
            Ok((plan, options)) => Ok(ExplainPlan::from_plan(&plan, &options)),
            Err(QueryError::Planner(e)) => Ok(ExplainPlan::from_error(&e)),
            Err(e) => Err(e),
        }
    }

    /// Inserts a record; unique violations come back as [`WriteError::Violation`]
    pub async fn insert(&self, model: &str, document: Value) -> QueryResult<Record> {
        let schema = self.catalog.require(model)?;
        let stored = self
            .store
            .insert(&schema.collection, document)
            .await
            .map_err(translate_write_error)?;
        Ok(Record::new(model, stored))
    }

    /// Ensures every declared index of every model; returns `collection.name` entries
    pub async fn ensure_indexes(&self) -> QueryResult<Vec<String>> {
        let manager = IndexManager::new(self.store.clone());
        let mut names = Vec::new();
        for model in self.catalog.models() {
            for name in manager.ensure_model_indexes(&model).await? {
                names.push(format!("{}.{}", model.collection, name));
            }
        }
        Ok(names)
    }
}
