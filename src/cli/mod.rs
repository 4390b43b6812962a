//! CLI module for aeroquery
//!
//! Provides command-line interface for:
//! - explain: Compile a request and print the plan
//! - query: One-shot query against seeded data
//! - indexes: Ensure declared indexes

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{boot, explain, explain_request, indexes, query, query_request, run_command};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_envelope, ok_envelope, parse_request, read_request, write_error, write_response};

/// Parse arguments, run the command, write the envelope.
///
/// Errors are written as an error envelope and also returned so the caller
/// can set the exit status.
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match run_command(cli.command).await {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}
