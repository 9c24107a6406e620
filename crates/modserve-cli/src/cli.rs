//! Command-line interface for modserve.

use clap::Parser;
use std::path::PathBuf;

/// Development web server for native ES modules.
///
/// Serves a project directory, rewrites bare import specifiers into
/// browser-resolvable URLs, and reloads connected browsers on change.
#[derive(Parser, Debug)]
#[command(name = "modserve", version, about)]
pub struct Cli {
    /// Directory to serve
    ///
    /// Every served file must live under this directory; requests that
    /// normalize outside it are rejected.
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Port to listen on
    ///
    /// If the port is busy the next ten ports are tried before giving up.
    #[arg(short, long, default_value_t = 8080, value_name = "PORT")]
    pub port: u16,

    /// SPA fallback document, relative to ROOT
    ///
    /// When set, navigation requests that match no file are answered
    /// with this document instead of a 404, so client-side routing
    /// works on deep links.
    #[arg(long, value_name = "FILE")]
    pub app_index: Option<PathBuf>,

    /// Disable bare import rewriting
    ///
    /// Served JavaScript modules are passed through byte-for-byte.
    #[arg(long)]
    pub no_rewrite: bool,

    /// Disable file watching and browser reload
    #[arg(long)]
    pub no_watch: bool,

    /// Open the server URL in the default browser on start
    #[arg(long)]
    pub open: bool,

    /// Enable debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["modserve"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.port, 8080);
        assert!(cli.app_index.is_none());
        assert!(!cli.no_rewrite);
        assert!(!cli.no_watch);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "modserve",
            "public",
            "--port",
            "3000",
            "--app-index",
            "index.html",
            "--no-rewrite",
            "--no-watch",
        ]);
        assert_eq!(cli.root, PathBuf::from("public"));
        assert_eq!(cli.port, 3000);
        assert_eq!(cli.app_index, Some(PathBuf::from("index.html")));
        assert!(cli.no_rewrite);
        assert!(cli.no_watch);
    }

    #[test]
    fn test_cli_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["modserve", "--verbose", "--quiet"]);
        assert!(result.is_err());
    }
}
