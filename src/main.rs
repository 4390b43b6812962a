//! aeroquery CLI entry point
//!
//! Parses arguments and dispatches to the CLI module; exits non-zero on
//! failure. All logic lives in `cli`.

use aeroquery::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
