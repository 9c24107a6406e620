//! Error handling for the modserve CLI.
//!
//! Two layers: `CliError` covers startup and process-level failures
//! (configuration, server bind, watcher creation), `ServeError` covers
//! the per-request taxonomy. No `ServeError` is ever fatal; each maps to
//! an HTTP status and the request ends there. Startup errors are the one
//! class that aborts the process, reported through miette at the top of
//! main.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found at startup
    #[error("File not found: {}\n\nHint: Check the ROOT argument and --app-index path", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server bind/startup errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Per-request error taxonomy.
///
/// Every variant is scoped to one request: the handler maps it to a
/// status code and carries on serving.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Request path normalizes outside the serving root
    #[error("Request path escapes the serving root: {0}")]
    PathEscapesRoot(String),

    /// No file exists at the resolved path
    #[error("File not found: {0}")]
    NotFound(String),

    /// I/O failure while reading the resolved file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Convert a CliError into a miette Report for terminal rendering.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::FileNotFound(path) => miette::miette!(
            "File not found: {}\n\nHint: Check the ROOT argument and --app-index path",
            path.display()
        ),
        CliError::Server(msg) => miette::miette!("Server error: {msg}"),
        other => miette::miette!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_message_carries_hint() {
        let err = CliError::FileNotFound(PathBuf::from("missing/root"));
        let msg = err.to_string();
        assert!(msg.contains("missing/root"));
        assert!(msg.contains("Hint:"));
    }

    #[test]
    fn test_serve_error_messages() {
        let err = ServeError::PathEscapesRoot("/../etc/passwd".to_string());
        assert!(err.to_string().contains("escapes the serving root"));

        let err = ServeError::NotFound("/missing.js".to_string());
        assert!(err.to_string().contains("/missing.js"));
    }

    #[test]
    fn test_cli_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CliError = io.into();
        assert!(matches!(err, CliError::Io(_)));
    }
}
