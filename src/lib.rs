//! # `tasktracker_stub`
//!
//! A local stand-in for the TaskTracker test case service, plus the agent
//! tools that copy and adapt test cases between its folders.

#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod seed;
#[cfg(feature = "server")]
pub mod server;
pub mod tools;
pub mod tracker;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
