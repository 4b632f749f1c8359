//! MCP server binary for TaskTracker test cases.
//!
//! This binary runs an MCP server that exposes the TaskTracker tools
//! through stdio transport.

use rmcp::ServiceExt;
use std::sync::Arc;
use tasktracker_stub::client::{HttpTrackerClient, LocalClient, TrackerClient};
use tasktracker_stub::config::TrackerConfig;
use tasktracker_stub::logging;
use tasktracker_stub::mcp::TrackerServer;
use tasktracker_stub::tracker::SqliteTrackerStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let project_dir = std::env::current_dir()?;

    // Initialize logging first (writes to .tasktracker/mcp.log)
    if let Err(e) = logging::init_file(&project_dir) {
        eprintln!("Warning: MCP logging init failed: {e}");
    }
    logging::install_panic_hook();

    let config = TrackerConfig::load()?;
    let client: Arc<dyn TrackerClient> = if config.use_stub {
        let store = match &config.stub_db {
            Some(path) => SqliteTrackerStore::new(path)?,
            None => SqliteTrackerStore::in_memory()?,
        };
        info!(db = ?config.stub_db, "using in-process TaskTracker stub");
        Arc::new(LocalClient::new(Arc::new(store)))
    } else {
        if config.api_key.is_none() {
            warn!(base_url = %config.base_url, "no TASKTRACKER_API_KEY set");
        }
        info!(base_url = %config.base_url, "using remote TaskTracker");
        Arc::new(HttpTrackerClient::new(&config)?)
    };

    let server = TrackerServer::new(client);
    info!("MCP server created, starting stdio transport");
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    info!("MCP server shut down");
    Ok(())
}
