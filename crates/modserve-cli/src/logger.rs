//! Logging infrastructure for the modserve CLI.
//!
//! Structured logging via the `tracing` ecosystem with verbosity flags
//! and `RUST_LOG` override.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Call once at startup, before any logging occurs.
///
/// # Verbosity
///
/// 1. `--verbose`: DEBUG for modserve crates
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG` environment variable: custom filter
/// 4. Default: INFO for modserve crates
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("modserve_cli=debug,modserve_resolve=debug")
    } else if quiet {
        EnvFilter::new("modserve_cli=error,modserve_resolve=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("modserve_cli=info,modserve_resolve=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
