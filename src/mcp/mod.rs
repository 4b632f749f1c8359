//! MCP (Model Context Protocol) server implementations.
//!
//! This module provides the MCP server exposing the TaskTracker tools to agents.

#[cfg(feature = "mcp")]
pub mod tracker_server;

#[cfg(feature = "mcp")]
pub use tracker_server::TrackerServer;
