//! Paginated executor
//!
//! Runs a compiled plan as two concurrent branches: the page and the total.
//! The total is never computed from anything that carries `$skip` or
//! `$limit`, so it is the same for every page of one query.

use std::iter;

use futures_util::future::try_join;
use serde_json::Value;

use super::errors::{ExecutorError, ExecutorResult};
use super::result::PageResult;
use crate::criteria::Options;
use crate::planner::{CompiledPlan, Stage, COUNT_FIELD};
use crate::store::{project, StoreHandle, StoreResult};

/// Executes compiled plans against a store
pub struct PaginatedExecutor {
    store: StoreHandle,
}

impl PaginatedExecutor {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Returns one page and, when `want_available`, the total match count.
    ///
    /// Either branch failing fails the call; no partial result is returned.
    pub async fn execute(
        &self,
        collection: &str,
        plan: &CompiledPlan,
        options: &Options,
        want_available: bool,
    ) -> ExecutorResult<PageResult> {
        let result = match plan {
            CompiledPlan::Filter(filter) => {
                self.execute_filter(collection, filter, options, want_available)
                    .await
            }
            CompiledPlan::Pipeline { stages, .. } => {
                self.execute_pipeline(collection, stages, options, want_available)
                    .await
            }
        };
        result.map_err(|e| ExecutorError::execution_failed(collection, e))
    }

    async fn execute_filter(
        &self,
        collection: &str,
        filter: &Value,
        options: &Options,
        want_available: bool,
    ) -> StoreResult<PageResult> {
        let items = self.find_page(collection, filter, options);

        if want_available {
            let (available, items) = try_join(self.store.count(collection, filter), items).await?;
            Ok(PageResult::new(items, Some(available)))
        } else {
            Ok(PageResult::new(items.await?, None))
        }
    }

    async fn find_page(
        &self,
        collection: &str,
        filter: &Value,
        options: &Options,
    ) -> StoreResult<Vec<Value>> {
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }
        let find_options = options.to_find_options();
        self.store.find(collection, filter, &find_options).await
    }

    async fn execute_pipeline(
        &self,
        collection: &str,
        prefix: &[Stage],
        options: &Options,
        want_available: bool,
    ) -> StoreResult<PageResult> {
        let item_stages = native(&items_branch(prefix, options));
        let items = self.aggregate_page(collection, &item_stages, options);

        if want_available {
            let count_stages = native(&count_branch(prefix));
            let count = self.aggregate_count(collection, &count_stages);
            let (available, items) = try_join(count, items).await?;
            Ok(PageResult::new(items, Some(available)))
        } else {
            Ok(PageResult::new(items.await?, None))
        }
    }

    async fn aggregate_page(
        &self,
        collection: &str,
        stages: &[Value],
        options: &Options,
    ) -> StoreResult<Vec<Value>> {
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }
        let rows = self.store.aggregate(collection, stages).await?;
        // Pipelines carry no projection stage; shape rows here
        Ok(rows
            .iter()
            .map(|row| project(row, &options.projection))
            .collect())
    }

    async fn aggregate_count(&self, collection: &str, stages: &[Value]) -> StoreResult<u64> {
        let rows = self.store.aggregate(collection, stages).await?;
        Ok(read_count(&rows))
    }
}

/// Shared prefix plus `$count`; no sort, skip or limit
pub fn count_branch(prefix: &[Stage]) -> Vec<Stage> {
    prefix
        .iter()
        .cloned()
        .chain(iter::once(Stage::Count(COUNT_FIELD.to_string())))
        .collect()
}

/// Shared prefix plus `$sort`, `$skip`, `$limit` in that order, each only when set
pub fn items_branch(prefix: &[Stage], options: &Options) -> Vec<Stage> {
    let mut stages = prefix.to_vec();
    if !options.sort.is_empty() {
        stages.push(Stage::Sort(options.sort.clone()));
    }
    if options.skip > 0 {
        stages.push(Stage::Skip(options.skip));
    }
    if let Some(limit) = options.limit {
        stages.push(Stage::Limit(limit));
    }
    stages
}

fn native(stages: &[Stage]) -> Vec<Value> {
    stages.iter().map(Stage::to_native).collect()
}

/// A missing count row means zero matches
fn read_count(rows: &[Value]) -> u64 {
    rows.first()
        .and_then(|row| row.get(COUNT_FIELD))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}
