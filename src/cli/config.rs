//! Configuration file loading

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::engine::QueryLimits;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog JSON (required)
    pub schema_path: PathBuf,

    /// Seed documents `{collection: [docs]}` (optional)
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    /// Whether the store joins natively (default: true)
    #[serde(default = "default_querying_associations")]
    pub querying_associations: bool,

    /// Largest accepted page size (default: 1000)
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,

    /// Page size when a request sets none (optional)
    #[serde(default)]
    pub default_limit: Option<u64>,
}

fn default_querying_associations() -> bool {
    true
}
fn default_max_limit() -> u64 {
    1000
}

impl Config {
    /// Load configuration from file; relative paths resolve against its directory
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        if let Some(base) = path.parent() {
            config.schema_path = base.join(&config.schema_path);
            config.data_path = config.data_path.map(|p| base.join(p));
        }
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.schema_path.as_os_str().is_empty() {
            return Err(CliError::config_error("schema_path must not be empty"));
        }

        if self.max_limit == 0 {
            return Err(CliError::config_error("max_limit must be > 0"));
        }

        if let Some(default) = self.default_limit {
            if default > self.max_limit {
                return Err(CliError::config_error(format!(
                    "default_limit {} exceeds max_limit {}",
                    default, self.max_limit
                )));
            }
        }

        Ok(())
    }

    pub fn limits(&self) -> QueryLimits {
        QueryLimits {
            default_limit: self.default_limit,
            max_limit: Some(self.max_limit),
        }
    }

    /// Seed documents by collection; empty when no data file is configured
    pub fn load_seed(&self) -> CliResult<BTreeMap<String, Vec<Value>>> {
        let Some(path) = &self.data_path else {
            return Ok(BTreeMap::new());
        };
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read data file: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid data JSON: {}", e)))
    }
}
