//! CLI command implementations
//!
//! Every command boots the same way: load the config, load the catalog,
//! seed a `MemoryStore`, build a `QueryEngine`. Commands return the `data`
//! member of the response envelope.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::engine::QueryEngine;
use crate::schema::Catalog;
use crate::store::{DocumentStore, MemoryStore};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::read_request;

/// Dispatch a command
pub async fn run_command(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Explain { config } => explain(&config).await,
        Command::Query { config } => query(&config).await,
        Command::Indexes { config } => indexes(&config).await,
    }
}

/// Builds an engine over a freshly seeded in-memory store
pub async fn boot(config: &Config) -> CliResult<QueryEngine> {
    let catalog = Catalog::load(&config.schema_path)
        .map_err(|e| CliError::config_error(e.to_string()))?;

    let store = if config.querying_associations {
        MemoryStore::new()
    } else {
        MemoryStore::without_joins()
    };

    for (collection, documents) in config.load_seed()? {
        for document in documents {
            store
                .insert(&collection, document)
                .await
                .map_err(|e| CliError::config_error(format!("Seeding {} failed: {}", collection, e)))?;
        }
    }

    Ok(QueryEngine::new(Arc::new(store), Arc::new(catalog)).with_limits(config.limits()))
}

/// Compile the stdin request and print the plan
pub async fn explain(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let engine = boot(&config).await?;
    explain_request(&engine, &read_request()?).await
}

/// Run the stdin request and print `{items, available}`
pub async fn query(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let engine = boot(&config).await?;
    engine.ensure_indexes().await?;
    query_request(&engine, &read_request()?).await
}

/// Ensure all declared indexes
pub async fn indexes(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let engine = boot(&config).await?;
    let names = engine.ensure_indexes().await?;
    Ok(json!({ "indexes": names }))
}

/// `{"model": ..., "where": ..., ...}` to an explain plan
pub async fn explain_request(engine: &QueryEngine, request: &Value) -> CliResult<Value> {
    let criteria = engine.request(request_model(request)?, request)?;
    Ok(engine.explain(criteria).await?.to_json())
}

/// `{"model": ..., "where": ..., ...}` to a page
pub async fn query_request(engine: &QueryEngine, request: &Value) -> CliResult<Value> {
    let criteria = engine.request(request_model(request)?, request)?;
    let page = engine.find(criteria).await?;
    Ok(serde_json::to_value(page)?)
}

fn request_model(request: &Value) -> CliResult<&str> {
    request
        .get("model")
        .and_then(Value::as_str)
        .ok_or_else(|| CliError::invalid_request("Request must name a 'model'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AssociationDescriptor, ModelSchema};

    async fn engine() -> QueryEngine {
        let parents = ModelSchema::new("Parent", "parents");
        let children = ModelSchema::new("Child", "children").with_association(
            AssociationDescriptor::belongs_to("Parent", "Parent", "parents", "parent_id"),
        );
        let catalog = Catalog::from_models([parents, children]).unwrap();
        let engine = QueryEngine::new(Arc::new(MemoryStore::new()), Arc::new(catalog));
        let parent = engine.insert("Parent", json!({"name": "p"})).await.unwrap();
        engine
            .insert("Child", json!({"parent_id": parent.id().cloned()}))
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn test_query_request() {
        let engine = engine().await;
        let request = json!({"model": "Child", "where": {"Parent.name": "p"}, "populate": "Parent"});
        let data = query_request(&engine, &request).await.unwrap();
        assert_eq!(data["available"], json!(1));
        assert_eq!(data["items"][0]["Parent"]["name"], json!("p"));
    }

    #[tokio::test]
    async fn test_explain_request() {
        let engine = engine().await;
        let request = json!({"model": "Child", "where": {"Parent.name": "p"}});
        let data = explain_request(&engine, &request).await.unwrap();
        assert_eq!(data["mode"], json!("pipeline"));
    }

    #[tokio::test]
    async fn test_missing_model() {
        let engine = engine().await;
        let err = query_request(&engine, &json!({"where": {}})).await.unwrap_err();
        assert_eq!(err.code_str(), "AERO_CLI_INVALID_REQUEST");
    }
}
