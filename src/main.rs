//! CLI binary for the TaskTracker stub.
//!
//! This binary is a thin wrapper that parses arguments and delegates to the library.

use std::process::ExitCode;

use clap::Parser;
use tasktracker_stub::cli::{run, Cli};
use tasktracker_stub::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_stderr();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
