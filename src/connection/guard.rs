// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use super::Session;
use crate::core::metrics;
use crate::core::state::ServerState;
use std::sync::Arc;
use tracing::debug;

/// Ensures a connection's registry entries and gauges are cleaned up however the
/// connection task exits.
pub struct ConnectionGuard {
    state: Arc<ServerState>,
    session: Arc<Session>,
}

impl ConnectionGuard {
    pub(crate) fn new(state: Arc<ServerState>, session: Arc<Session>) -> Self {
        metrics::CONNECTED_CLIENTS.inc();
        Self { state, session }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        metrics::CONNECTED_CLIENTS.dec();
        debug!(
            "ConnectionGuard dropping, cleaning up resources for connection {}",
            self.session.addr()
        );
        // Anyone still holding the session must see it as closed from here on.
        self.session.close(None);
        self.state.registry.remove(&self.session);
    }
}
