//! Server configuration.
//!
//! Built once from CLI arguments at startup and never mutated after.

use crate::cli::Cli;
use crate::error::{CliError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Immutable, process-lifetime server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Canonical serving root; every served file is a strict descendant
    pub root: PathBuf,

    /// Server socket address (IP + port)
    pub addr: SocketAddr,

    /// SPA fallback document, relative to the root (None disables fallback)
    pub app_index: Option<PathBuf>,

    /// Rewrite bare import specifiers in served JavaScript modules
    pub rewrite: bool,

    /// Watch the root and push reload events to connected browsers
    pub watch: bool,

    /// Patterns to ignore when watching files
    pub watch_ignore: Vec<String>,

    /// Debounce delay in milliseconds for file changes
    pub debounce_ms: u64,
}

impl ServerConfig {
    /// Build the configuration from parsed CLI arguments.
    ///
    /// Canonicalizes the root so containment checks and specifier
    /// resolution operate on a stable absolute path.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the root directory does not exist and
    /// a port error if no port in the probed range is free. These abort
    /// the process before any connection is accepted.
    pub fn from_args(args: &Cli) -> Result<Self> {
        let root = std::fs::canonicalize(&args.root)
            .map_err(|_| CliError::FileNotFound(args.root.clone()))?;
        if !root.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "ROOT is not a directory: {}",
                root.display()
            )));
        }

        let addr = Self::find_available_port(args.port)?;

        // node_modules stays watched: package edits must invalidate the
        // resolution cache and reload clients.
        let watch_ignore = vec![".git".to_string(), "*.log".to_string(), ".DS_Store".to_string()];

        Ok(Self {
            root,
            addr,
            app_index: args.app_index.clone(),
            rewrite: !args.no_rewrite,
            watch: !args.no_watch,
            watch_ignore,
            debounce_ms: 100,
        })
    }

    /// Validate the configuration before accepting connections.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the configured SPA fallback document
    /// is missing.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref app_index) = self.app_index {
            let path = self.root.join(app_index);
            if !path.is_file() {
                return Err(CliError::FileNotFound(path));
            }
        }
        Ok(())
    }

    /// Find an available port starting from the requested port.
    ///
    /// Tries the requested port first, then the next ten.
    fn find_available_port(requested_port: u16) -> Result<SocketAddr> {
        use std::net::TcpListener;

        if requested_port < 1024 {
            crate::ui::warning(&format!(
                "Port {} is in privileged range, may require root access",
                requested_port
            ));
        }

        let addr = SocketAddr::from(([127, 0, 0, 1], requested_port));
        if TcpListener::bind(addr).is_ok() {
            return Ok(addr);
        }

        for offset in 1..=10 {
            let port = requested_port.saturating_add(offset);
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            if TcpListener::bind(addr).is_ok() {
                crate::ui::warning(&format!(
                    "Port {} is busy, using port {} instead",
                    requested_port, port
                ));
                return Ok(addr);
            }
        }

        Err(CliError::Server(format!(
            "Ports {}-{} are all in use. Try a different port range.",
            requested_port,
            requested_port + 10
        )))
    }

    /// Get the server URL as a string.
    pub fn server_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}
