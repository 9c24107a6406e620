//! Server lifecycle orchestration.
//!
//! Wires configuration, shared state, the file watcher, and the HTTP
//! server together, then drives the main event loop until Ctrl+C.

use std::path::Path;
use std::sync::Arc;

use tokio::signal;

use crate::cli::Cli;
use crate::error::Result;
use crate::server::{DevServer, FileChange, ReloadEvent, ServerConfig, ServerState, SharedState};
use crate::ui;

/// Execute the server with parsed CLI arguments.
///
/// # Process Flow
///
/// 1. Build and validate configuration (fatal on bad root/app-index)
/// 2. Create shared state
/// 3. Start the file watcher (unless --no-watch)
/// 4. Start the HTTP server on a background task
/// 5. Event loop: forward change events to connected browsers, handle
///    Ctrl+C for shutdown
pub async fn execute(args: Cli) -> Result<()> {
    let config = ServerConfig::from_args(&args)?;
    config.validate()?;

    ui::info(&format!("Serving directory: {}", config.root.display()));
    if let Some(ref app_index) = config.app_index {
        ui::info(&format!("SPA fallback: {}", app_index.display()));
    }
    if !config.rewrite {
        ui::info("Bare import rewriting disabled");
    }

    let state: SharedState = Arc::new(ServerState::new(config.clone()));

    // Watcher before server, so no early change can be missed once
    // clients connect.
    let mut change_rx = if config.watch {
        let (watcher, rx) = crate::server::FileWatcher::new(
            config.root.clone(),
            config.watch_ignore.clone(),
            config.debounce_ms,
        )?;
        ui::info(&format!(
            "Watching for changes in: {}",
            watcher.root().display()
        ));
        // Keep the watcher alive for the whole session
        Some((watcher, rx))
    } else {
        None
    };

    let server = DevServer::new(state.clone());
    let server_url = config.server_url();
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.start().await {
            ui::error(&format!("Server error: {}", e));
        }
    });

    if args.open {
        open_browser(&server_url);
    }

    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(change) = recv_change(&mut change_rx) => {
                handle_file_change(change, &state);
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down...");
                break;
            }

            _ = &mut server_handle => {
                ui::warning("Server task completed unexpectedly");
                break;
            }
        }
    }

    ui::success("Server stopped");
    Ok(())
}

/// Receive the next change event, pending forever when watching is off.
async fn recv_change(
    watcher: &mut Option<(crate::server::FileWatcher, tokio::sync::mpsc::Receiver<FileChange>)>,
) -> Option<FileChange> {
    match watcher {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Handle a file change: invalidate resolutions for package changes and
/// notify every connected browser.
fn handle_file_change(change: FileChange, state: &SharedState) {
    let path = change.path();
    tracing::info!("File changed: {}", path.display());

    if is_package_path(path) {
        state.resolutions.invalidate_all();
        tracing::debug!("Resolution cache invalidated");
    }

    let relative = path
        .strip_prefix(&state.config.root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    state.broadcast(&ReloadEvent::FileChanged { path: relative });
}

/// Whether a changed path lives under a node_modules directory.
fn is_package_path(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str() == "node_modules")
}

/// Open the server URL in the default browser.
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {}", url)),
        Err(e) => ui::warning(&format!("Failed to open browser: {}", e)),
    }
}
