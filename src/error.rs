//! Centralized error handling for receiptsync.
//!
//! Every fallible library operation returns [`Result<T>`], whose error side is
//! [`SyncError`]. Variants are categories callers can match on:
//!
//! ```
//! use receiptsync::error::SyncError;
//!
//! fn describe(err: &SyncError) -> &'static str {
//!     match err {
//!         SyncError::NotFound(_) => "missing file",
//!         SyncError::IndexCorrupt { .. } => "day index needs repair",
//!         SyncError::AlreadyRunning => "try again later",
//!         _ => "other failure",
//!     }
//! }
//! ```
//!
//! Integrity problems (orphans, checksum mismatches, ...) are never errors.
//! They are reported as [`crate::integrity::IntegrityAlert`] values.
//!
//! ## Context Extension Trait
//!
//! [`ResultExt`] adds `.context()` to any `Result` whose error converts into
//! [`SyncError`]. Unlike a plain string wrapper it keeps the original category,
//! so a `NotFound` stays a `NotFound` after context is attached:
//!
//! ```no_run
//! use receiptsync::error::{Result, ResultExt as _};
//!
//! fn load(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).context("Failed to load day index")
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Main error type for receiptsync operations.
#[derive(Debug)]
pub enum SyncError {
    /// A required file or folder does not exist
    NotFound(PathBuf),

    /// Any other I/O failure (permissions, interrupted reads, ...)
    Io(std::io::Error),

    /// A day index exists but its content could not be parsed
    IndexCorrupt { path: PathBuf, reason: String },

    /// Path is structurally unusable for the requested operation
    InvalidPath(String),

    /// Filename violates the `YYYY-MM-DD_N.jpg` grammar or its date invariant
    InvalidFilename(String),

    /// Remote storage operation failed
    Remote(String),

    /// Local receipt store operation failed
    Store(String),

    /// Configuration errors
    Config(String),

    /// A backfill run is already in flight for this store
    AlreadyRunning,

    /// No persisted alert carries this id
    AlertNotFound(String),

    /// Generic error with context
    Other(String),
}

impl SyncError {
    /// Returns true if this error denotes a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Prefix the message of this error while keeping its category.
    fn with_prefix(self, prefix: &str) -> Self {
        match self {
            Self::NotFound(path) => Self::NotFound(path),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), format!("{prefix}: {e}"))),
            Self::IndexCorrupt { path, reason } => Self::IndexCorrupt {
                path,
                reason: format!("{prefix}: {reason}"),
            },
            Self::InvalidPath(msg) => Self::InvalidPath(format!("{prefix}: {msg}")),
            Self::InvalidFilename(msg) => Self::InvalidFilename(format!("{prefix}: {msg}")),
            Self::Remote(msg) => Self::Remote(format!("{prefix}: {msg}")),
            Self::Store(msg) => Self::Store(format!("{prefix}: {msg}")),
            Self::Config(msg) => Self::Config(format!("{prefix}: {msg}")),
            Self::AlreadyRunning => Self::AlreadyRunning,
            Self::AlertNotFound(id) => Self::AlertNotFound(id),
            Self::Other(msg) => Self::Other(format!("{prefix}: {msg}")),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Not found: {}", path.display()),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::IndexCorrupt { path, reason } => {
                write!(f, "Corrupt day index {}: {reason}", path.display())
            }
            Self::InvalidPath(msg) => write!(f, "Invalid path: {msg}"),
            Self::InvalidFilename(msg) => write!(f, "Invalid filename: {msg}"),
            Self::Remote(msg) => write!(f, "Remote storage error: {msg}"),
            Self::Store(msg) => write!(f, "Receipt store error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::AlreadyRunning => write!(f, "A backfill run is already in progress"),
            Self::AlertNotFound(id) => write!(f, "No alert with id {id}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

/// Result type alias for receiptsync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Map an I/O error on `path` into the matching category.
///
/// `ErrorKind::NotFound` becomes [`SyncError::NotFound`] so callers can tell a
/// missing file apart from a failing disk.
pub fn io_error(path: impl Into<PathBuf>, err: std::io::Error) -> SyncError {
    let path = path.into();
    if err.kind() == std::io::ErrorKind::NotFound {
        SyncError::NotFound(path)
    } else {
        SyncError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {err}", path.display()),
        ))
    }
}

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SyncError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_prefix(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_prefix(&f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::Remote("upload rejected".to_owned());
        assert_eq!(err.to_string(), "Remote storage error: upload rejected");
    }

    #[test]
    fn test_io_error_maps_not_found() {
        let err = io_error(
            "/tmp/missing.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert!(err.to_string().contains("missing.jpg"));
    }

    #[test]
    fn test_io_error_keeps_other_kinds() {
        let err = io_error(
            "/tmp/locked.jpg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SyncError::Io(_)));
    }

    #[test]
    fn test_context_preserves_category() {
        let result: Result<()> = Err(SyncError::NotFound(PathBuf::from("a.jpg")));
        let result = result.context("Failed to hash receipt");
        assert!(matches!(result, Err(SyncError::NotFound(_))));

        let result: std::result::Result<(), SyncError> = Err(SyncError::Store("locked".to_owned()));
        let err = result.context("Failed to mark synced").unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert!(err.to_string().contains("Failed to mark synced"));
    }

    #[test]
    fn test_context_on_io_error() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = result.context("Failed to list folder").unwrap_err();
        assert!(err.to_string().contains("Failed to list folder"));
    }
}
