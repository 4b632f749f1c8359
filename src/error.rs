//! Error types for `tasktracker_stub`.

use std::fmt;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A folder in the folder tree.
    Folder,
    /// A unit addressed through the TMS API.
    Unit,
    /// A unit addressed through the flat test-case API.
    TestCase,
}

impl EntityKind {
    /// Human-readable name used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "Folder",
            Self::Unit => "Unit",
            Self::TestCase => "Test case",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in the tracker stub, its clients and tools.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A folder, unit or test case code does not exist.
    #[error("{kind} not found: {code}")]
    NotFound {
        /// What was looked up.
        kind: EntityKind,
        /// The code that was not found.
        code: String,
    },

    /// The request was well-formed JSON but violates the expected shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A JSON parsing error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `SQLite` database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The HTTP transport to a remote TaskTracker failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote TaskTracker answered with an unexpected status.
    #[error("TaskTracker API returned {status}: {body}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The response body (possibly truncated).
        body: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(kind: EntityKind, code: impl Into<String>) -> Self {
        Self::NotFound { kind, code: code.into() }
    }

    /// Shorthand for an [`Error::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Report a missing unit as a missing test case.
    ///
    /// Both name the same record; the flat API and the tools use the latter.
    #[must_use]
    pub fn for_test_case(self) -> Self {
        match self {
            Self::NotFound { kind: EntityKind::Unit, code } => {
                Self::NotFound { kind: EntityKind::TestCase, code }
            }
            other => other,
        }
    }

    /// Whether this error is a lookup failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
