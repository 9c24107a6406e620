//! Shared state for the running server.
//!
//! Holds the immutable configuration, the specifier resolution cache,
//! and the registry of connected reload subscribers. Client registry
//! access uses parking_lot RwLock; broadcasts iterate a cloned snapshot
//! so registration never races delivery.

use std::collections::HashMap;
use std::sync::Arc;

use modserve_resolve::ResolutionCache;
use parking_lot::RwLock;

use crate::server::config::ServerConfig;
use crate::server::ReloadEvent;

/// Shared server state.
pub struct ServerState {
    /// Immutable server configuration
    pub config: ServerConfig,

    /// Bare-specifier resolution cache, invalidated on package changes
    pub resolutions: ResolutionCache,

    /// Connected SSE subscribers
    clients: RwLock<HashMap<usize, tokio::sync::mpsc::Sender<String>>>,

    /// Next subscriber ID
    next_client_id: RwLock<usize>,
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<ServerState>;

impl ServerState {
    /// Create new server state from a validated configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            resolutions: ResolutionCache::new(),
            clients: RwLock::new(HashMap::new()),
            next_client_id: RwLock::new(0),
        }
    }

    /// Register a new reload subscriber.
    ///
    /// # Returns
    ///
    /// Subscriber ID and the receiver its SSE stream drains.
    pub fn register_client(&self) -> (usize, tokio::sync::mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    /// Remove a reload subscriber.
    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Number of connected subscribers.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Broadcast an event to every connected subscriber.
    ///
    /// Delivery is best-effort and never waits: a subscriber whose
    /// channel is closed, or whose buffer is full because the client
    /// stopped draining, is dropped from the registry after the send
    /// loop. One stalled subscriber cannot delay delivery to the rest.
    pub fn broadcast(&self, event: &ReloadEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

        let clients = self.clients.read().clone();

        let mut failed_ids = Vec::new();
        for (id, tx) in clients {
            if tx.try_send(json.clone()).is_err() {
                failed_ids.push(id);
            }
        }

        for id in failed_ids {
            tracing::debug!("Dropping stalled or disconnected reload subscriber {id}");
            self.unregister_client(id);
        }
    }
}
