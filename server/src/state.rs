//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the connection registry, the two external collaborators (room
//! store and authenticator) behind trait objects, and the sender half of
//! the persistence queue. Clone is cheap: every field is an `Arc` or a
//! channel handle.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::services::auth::Authenticator;
use crate::services::persistence::PersistJob;
use crate::services::registry::ConnectionRegistry;
use crate::services::store::RoomStore;

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub store: Arc<dyn RoomStore>,
    pub auth: Arc<dyn Authenticator>,
    pub persist_tx: mpsc::Sender<PersistJob>,
    pub relay: RelayConfig,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn RoomStore>,
        auth: Arc<dyn Authenticator>,
        persist_tx: mpsc::Sender<PersistJob>,
        relay: RelayConfig,
    ) -> Self {
        Self { registry: ConnectionRegistry::new(), store, auth, persist_tx, relay }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
