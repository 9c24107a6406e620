//! Development server module.
//!
//! - Static file serving with conditional-request caching
//! - Bare import rewriting for served JavaScript modules
//! - SPA fallback routing for client-side-routed navigations
//! - Live reload via Server-Sent Events and a recursive file watcher

pub mod config;
pub mod server;
pub mod state;
pub mod static_files;
pub mod watcher;

// Re-exports
pub use config::ServerConfig;
pub use server::{respond, DevServer, EVENTS_PATH, RELOAD_SCRIPT_PATH};
pub use state::{ServerState, SharedState};
pub use watcher::{ChangeKind, FileChange, FileWatcher};

use serde::{Deserialize, Serialize};

/// Events pushed over the reload channel.
///
/// Delivery is best-effort and idempotent on the client side: any
/// message triggers a full reload, so duplicates and stale events are
/// harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReloadEvent {
    /// A watched file changed; path is relative to the serving root
    FileChanged { path: String },
}
