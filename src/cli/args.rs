//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroquery explain --config <path>
//! - aeroquery query --config <path>
//! - aeroquery indexes --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeroquery - compile and run paginated criteria queries
#[derive(Parser, Debug)]
#[command(name = "aeroquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a criteria request from stdin and print the plan
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroquery.json")]
        config: PathBuf,
    },

    /// Execute a criteria request from stdin against the seeded store
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroquery.json")]
        config: PathBuf,
    },

    /// Ensure every declared index and print the index names
    Indexes {
        /// Path to configuration file
        #[arg(long, default_value = "./aeroquery.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
