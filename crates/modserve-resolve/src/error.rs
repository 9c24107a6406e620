//! Error types for specifier resolution.
//!
//! Resolution failures are per-specifier and never fatal to a request:
//! the server serves the module with the specifier intact and surfaces
//! the error as a diagnostic.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving or rewriting module specifiers.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No package matching a bare specifier was found anywhere up the
    /// directory chain.
    #[error("Cannot resolve bare specifier '{specifier}' imported from {}\n\nHint: Is the package installed under node_modules?", .importer.display())]
    SpecifierUnresolved {
        /// The bare specifier that failed to resolve
        specifier: String,
        /// The module that imported it
        importer: PathBuf,
    },

    /// A package.json file exists but could not be parsed.
    #[error("Invalid package descriptor at {}: {source}", .path.display())]
    DescriptorInvalid {
        /// Path to the offending package.json
        path: PathBuf,
        /// Underlying JSON parse error
        #[source]
        source: serde_json::Error,
    },

    /// I/O errors from descriptor reads or existence checks.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `ResolveError` as the default error type.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
