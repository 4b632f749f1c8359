//! Tracing setup for the stub server and the MCP server.
//!
//! The HTTP stub logs to stderr. The MCP server cannot, since stdout and
//! stderr are owned by the protocol host, so it logs to
//! `.tasktracker/mcp.log` in the working directory.

use std::fs::{self, OpenOptions};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directory holding the MCP log, relative to the working directory.
pub const LOG_DIR: &str = ".tasktracker";

/// The log filename within [`LOG_DIR`].
const LOG_FILENAME: &str = "mcp.log";

/// Maximum log file size before rotation (1MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Filter from `RUST_LOG`, defaulting to `info`.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global subscriber writing formatted events to stderr.
///
/// Does nothing if a global subscriber is already set.
pub fn init_stderr() {
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    let _ = tracing_subscriber::registry().with(env_filter()).with(fmt_layer).try_init();
}

/// Get the path to the MCP log file.
#[must_use]
pub fn log_path(base_dir: &Path) -> PathBuf {
    base_dir.join(LOG_DIR).join(LOG_FILENAME)
}

/// Install a global subscriber appending to the MCP log file.
///
/// Returns the path of the log file.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn init_file(base_dir: &Path) -> std::io::Result<PathBuf> {
    let path = log_path(base_dir);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate_if_large(&path);

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let fmt_layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
    let _ = tracing_subscriber::registry().with(env_filter()).with(fmt_layer).try_init();

    info!(version = crate::VERSION, "MCP server starting");
    Ok(path)
}

/// Move an oversized log aside to `<name>.log.old`.
fn rotate_if_large(path: &Path) {
    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    if metadata.len() > MAX_LOG_SIZE {
        let _ = fs::rename(path, path.with_extension("log.old"));
    }
}

/// Install a panic hook that records panics as error events.
///
/// The previous hook still runs afterwards.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
        );
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());

        error!(%location, "panic: {payload}");
        original_hook(info);
    }));
}

/// A guard that logs a tool call's outcome and duration when dropped.
///
/// ```ignore
/// let mut guard = ToolCallGuard::new("create_test_case");
/// // ... execute tool, calling guard.mark_error() on failure ...
/// ```
#[derive(Debug)]
pub struct ToolCallGuard {
    tool: &'static str,
    start: Instant,
    success: bool,
}

impl ToolCallGuard {
    /// Create a new tool call guard and log the start.
    #[must_use]
    pub fn new(tool: &'static str) -> Self {
        info!(tool, "tool call started");
        Self { tool, start: Instant::now(), success: true }
    }

    /// Mark the tool call as failed.
    pub fn mark_error(&mut self) {
        self.success = false;
    }
}

impl Drop for ToolCallGuard {
    fn drop(&mut self) {
        let duration_ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        if self.success {
            info!(tool = self.tool, duration_ms, outcome = "ok", "tool call finished");
        } else {
            warn!(tool = self.tool, duration_ms, outcome = "error", "tool call finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        buf.contents()
    }

    #[test]
    fn test_log_path() {
        let path = log_path(Path::new("/project"));
        assert_eq!(path, PathBuf::from("/project/.tasktracker/mcp.log"));
    }

    #[test]
    fn test_tool_call_guard_logs_success() {
        let output = capture(|| {
            let _guard = ToolCallGuard::new("get_test_cases");
        });
        assert!(output.contains("tool call started"));
        assert!(output.contains("tool call finished"));
        assert!(output.contains("get_test_cases"));
        assert!(output.contains("outcome=\"ok\""));
    }

    #[test]
    fn test_tool_call_guard_logs_error() {
        let output = capture(|| {
            let mut guard = ToolCallGuard::new("delete_test_case");
            guard.mark_error();
        });
        assert!(output.contains("WARN"));
        assert!(output.contains("outcome=\"error\""));
    }

    #[test]
    fn test_rotate_if_large() {
        let dir = TempDir::new().unwrap();
        let path = log_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        let size = usize::try_from(MAX_LOG_SIZE + 1).unwrap();
        fs::write(&path, "x".repeat(size)).unwrap();

        rotate_if_large(&path);

        assert!(path.with_extension("log.old").exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_rotate_keeps_small_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.log");
        fs::write(&path, "small").unwrap();

        rotate_if_large(&path);

        assert!(path.exists());
        assert!(!path.with_extension("log.old").exists());
    }

    #[test]
    fn test_rotate_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        rotate_if_large(&dir.path().join("absent.log"));
    }

    #[serial_test::serial]
    #[test]
    fn test_init_file_creates_log() {
        let dir = TempDir::new().unwrap();
        let path = init_file(dir.path()).unwrap();
        assert_eq!(path, log_path(dir.path()));
        assert!(path.exists());
    }

    #[serial_test::serial]
    #[test]
    fn test_panic_hook_runs_previous_hook() {
        install_panic_hook();
        let output = capture(|| {
            let _ = panic::catch_unwind(|| {
                panic!("test panic message");
            });
        });
        let _ = panic::take_hook();
        assert!(output.contains("panic: test panic message"));
    }
}
