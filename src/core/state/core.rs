// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::registry::SessionRegistry;
use super::stats::StatsState;
use crate::config::Config;
use crate::core::AnchorageError;
use crate::core::commands;
use crate::core::handler::Dispatcher;
use crate::core::persistence::Store;
use crate::connection::Session;
use crate::core::protocol::DisconnectReason;
use std::sync::Arc;
use tracing::info;

/// The central struct holding all shared, server-wide state.
/// It is wrapped in an `Arc` and handed to every connection task and handler.
#[derive(Debug)]
pub struct ServerState {
    /// The configuration the server was started with.
    pub config: Config,
    /// Every live session, indexed by session id and by bound account.
    pub registry: SessionRegistry,
    /// The relational store handlers mutate through transactions.
    pub store: Store,
    /// The packet-id to handler table, fixed at startup.
    pub dispatcher: Dispatcher,
    pub stats: StatsState,
}

impl ServerState {
    /// Opens the configured store and installs the built-in handler table.
    pub fn initialize(config: Config) -> Result<Arc<Self>, AnchorageError> {
        let store = Store::open(&config.database.path)?;
        info!("Store opened at '{}'.", config.database.path);
        let dispatcher = commands::default_dispatcher()?;
        info!("{} packet handlers registered.", dispatcher.len());
        Ok(Self::with_parts(config, store, dispatcher))
    }

    /// Assembles a state from already-built parts, e.g. a custom handler table in tests.
    pub fn with_parts(config: Config, store: Store, dispatcher: Dispatcher) -> Arc<Self> {
        let registry = SessionRegistry::new();
        if config.maintenance {
            registry.set_maintenance(true);
        }
        Arc::new(Self {
            config,
            registry,
            store,
            dispatcher,
            stats: StatsState::new(),
        })
    }

    // --- Control surface ---

    /// Enables or disables maintenance mode. Enabling disconnects every session.
    pub fn set_maintenance(&self, enabled: bool) -> usize {
        self.registry.set_maintenance(enabled)
    }

    /// Stops or resumes admitting sessions. Stopping disconnects every session.
    pub fn set_accepting_connections(&self, accepting: bool) -> usize {
        self.registry.set_accepting_connections(accepting)
    }

    pub fn disconnect_all(&self, reason: DisconnectReason) -> usize {
        self.registry.disconnect_all(reason)
    }

    pub fn kick_account(&self, account_id: u32, reason: DisconnectReason) -> bool {
        self.registry.kick_account(account_id, reason)
    }

    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    pub fn list_sessions(&self) -> Vec<Arc<Session>> {
        self.registry.list_sessions()
    }

    pub fn find_session(&self, session_id: u64) -> Option<Arc<Session>> {
        self.registry.lookup(session_id)
    }

    pub fn find_session_by_account(&self, account_id: u32) -> Option<Arc<Session>> {
        self.registry.lookup_by_account(account_id)
    }
}
