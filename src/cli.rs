//! Command-line interface for the TaskTracker stub.

use crate::client::{HttpTrackerClient, LocalClient};
use crate::config::TrackerConfig;
use crate::error::Result;
use crate::seed::seed;
use crate::server::{self, AppState};
use crate::tracker::SqliteTrackerStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Address the stub listens on by default.
pub const DEFAULT_BIND: &str = "127.0.0.1:8765";

/// TaskTracker stub - a local stand-in for the TaskTracker test case service.
///
/// Configuration is read from `.tasktracker.yaml` and `TASKTRACKER_*`
/// environment variables; flags take precedence.
#[derive(Parser, Debug)]
#[command(name = "tasktracker-stub")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP stub.
    ///
    /// Serves the flat `/folders` and `/test-cases` API and the TMS plugin
    /// API from one store.
    Serve {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,

        /// Database file (defaults to TASKTRACKER_STUB_DB, else in memory)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Load the sample folders and test cases before serving
        #[arg(long)]
        seed: bool,
    },

    /// Post the sample folders and test cases to a running TaskTracker.
    Seed {
        /// Base URL of the TaskTracker (defaults to TASKTRACKER_BASE_URL)
        #[arg(long)]
        url: Option<String>,
    },
}

/// Run a parsed command line.
///
/// # Errors
///
/// Returns an error if configuration, the store, or the network fails.
pub async fn run(cli: Cli) -> Result<()> {
    let config = TrackerConfig::load()?;

    match cli.command {
        Command::Serve { bind, db, seed: with_samples } => {
            let store = match db.or(config.stub_db) {
                Some(path) => SqliteTrackerStore::new(&path)?,
                None => SqliteTrackerStore::in_memory()?,
            };
            let store = Arc::new(store);

            if with_samples {
                let summary = seed(&LocalClient::new(Arc::clone(&store))).await?;
                info!(folders = summary.folders, test_cases = summary.test_cases, "sample data loaded");
            }

            let listener = TcpListener::bind(&bind).await?;
            server::serve(listener, AppState::new(store), shutdown_signal()).await?;
            Ok(())
        }
        Command::Seed { url } => {
            let config = TrackerConfig { base_url: url.unwrap_or(config.base_url), ..config };
            let client = HttpTrackerClient::new(&config)?;
            let summary = seed(&client).await?;
            println!(
                "Done. {} folders, {} test cases at {}",
                summary.folders,
                summary.test_cases,
                client.base_url()
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["tasktracker-stub", "serve"]);
        match cli.command {
            Command::Serve { bind, db, seed } => {
                assert_eq!(bind, DEFAULT_BIND);
                assert!(db.is_none());
                assert!(!seed);
            }
            Command::Seed { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::parse_from([
            "tasktracker-stub",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--db",
            "/tmp/stub.db",
            "--seed",
        ]);
        let Command::Serve { bind, db, seed } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(bind, "0.0.0.0:9000");
        assert_eq!(db, Some(PathBuf::from("/tmp/stub.db")));
        assert!(seed);
    }

    #[test]
    fn test_seed_url() {
        let cli = Cli::parse_from(["tasktracker-stub", "seed", "--url", "http://127.0.0.1:8765"]);
        let Command::Seed { url } = cli.command else {
            panic!("expected seed");
        };
        assert_eq!(url.as_deref(), Some("http://127.0.0.1:8765"));
    }
}
