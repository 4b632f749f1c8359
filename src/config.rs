//! Configuration for the TaskTracker client and stub.
//!
//! Settings are resolved in layers: built-in defaults, then the optional
//! `.tasktracker.yaml` file in the working directory, then `TASKTRACKER_*`
//! environment variables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file path relative to the working directory.
pub const CONFIG_FILE_PATH: &str = ".tasktracker.yaml";

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_BASE_URL: &str = "TASKTRACKER_BASE_URL";
const ENV_API_KEY: &str = "TASKTRACKER_API_KEY";
const ENV_USE_STUB: &str = "TASKTRACKER_USE_STUB";
const ENV_TIMEOUT_SECS: &str = "TASKTRACKER_TIMEOUT_SECS";
const ENV_STUB_DB: &str = "TASKTRACKER_STUB_DB";

/// TaskTracker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Base URL of the TaskTracker API.
    pub base_url: String,

    /// API key sent as a bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Serve tools from an in-process stub instead of the remote API.
    pub use_stub: bool,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Database file for the stub store. In memory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stub_db: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            use_stub: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            stub_db: None,
        }
    }
}

impl TrackerConfig {
    /// Load config from the working directory and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// an environment variable holds an invalid value.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."), |name| std::env::var(name).ok())
    }

    /// Load config from a base directory, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// a variable holds an invalid value.
    pub fn load_from(base_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self::from_file(base_dir)?.unwrap_or_default();
        config.with_overrides(lookup)
    }

    /// Read the YAML config file, returning None if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn from_file(base_dir: &Path) -> Result<Option<Self>> {
        let config_path = base_dir.join(CONFIG_FILE_PATH);
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(Some(config))
    }

    /// Apply environment overrides on top of this config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the timeout is not a number.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(api_key) = lookup(ENV_API_KEY).filter(|key| !key.is_empty()) {
            self.api_key = Some(api_key);
        }
        if let Some(flag) = lookup(ENV_USE_STUB) {
            self.use_stub = parse_flag(&flag);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::invalid(format!("{ENV_TIMEOUT_SECS} must be a number of seconds, got {timeout:?}"))
            })?;
        }
        if let Some(path) = lookup(ENV_STUB_DB).filter(|path| !path.is_empty()) {
            self.stub_db = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Interpret a boolean-ish environment value.
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = TrackerConfig::load_from(dir.path(), |_| None).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.use_stub);
    }

    #[test]
    fn test_env_overrides() {
        let dir = TempDir::new().unwrap();
        let config = TrackerConfig::load_from(
            dir.path(),
            lookup_from(&[
                (ENV_BASE_URL, "http://tracker.local/api"),
                (ENV_API_KEY, "secret"),
                (ENV_USE_STUB, "YES"),
                (ENV_TIMEOUT_SECS, "5"),
                (ENV_STUB_DB, "/tmp/stub.db"),
            ]),
        )
        .unwrap();
        assert_eq!(config.base_url, "http://tracker.local/api");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert!(config.use_stub);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.stub_db, Some(PathBuf::from("/tmp/stub.db")));
    }

    #[test]
    fn test_parse_flag() {
        for truthy in ["1", "true", "TRUE", "Yes", " yes "] {
            assert!(parse_flag(truthy), "{truthy}");
        }
        for falsy in ["0", "false", "no", "", "on"] {
            assert!(!parse_flag(falsy), "{falsy}");
        }
    }

    #[test]
    fn test_invalid_timeout() {
        let err = TrackerConfig::default()
            .with_overrides(lookup_from(&[(ENV_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_empty_api_key_ignored() {
        let config =
            TrackerConfig::default().with_overrides(lookup_from(&[(ENV_API_KEY, "")])).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_file_layer_then_env() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_PATH),
            "base_url: http://from-file/api\nuse_stub: true\n",
        )
        .unwrap();

        let config = TrackerConfig::load_from(dir.path(), |_| None).unwrap();
        assert_eq!(config.base_url, "http://from-file/api");
        assert!(config.use_stub);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let config =
            TrackerConfig::load_from(dir.path(), lookup_from(&[(ENV_USE_STUB, "0")])).unwrap();
        assert_eq!(config.base_url, "http://from-file/api");
        assert!(!config.use_stub);
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_PATH), "timeout_secs: [not, a, number]").unwrap();
        let err = TrackerConfig::load_from(dir.path(), |_| None).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[serial_test::serial]
    #[test]
    fn test_load_reads_process_env() {
        std::env::set_var(ENV_BASE_URL, "http://env-only/api");
        let config = TrackerConfig::load();
        std::env::remove_var(ENV_BASE_URL);
        assert_eq!(config.unwrap().base_url, "http://env-only/api");
    }
}
