// src/server/initialization.rs

//! Handles server initialization: state setup, store opening and listener binding.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::state::ServerState;
use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let server_state = ServerState::initialize(config)?;
    info!("Server state initialized.");
    setup_with_state(server_state).await
}

/// Binds the listener for an already-built state.
pub async fn setup_with_state(server_state: Arc<ServerState>) -> Result<ServerContext> {
    let (shutdown_tx, _) = broadcast::channel(1);

    let config = &server_state.config;
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        "Anchorage server listening on {}",
        listener.local_addr()?
    );
    let connection_permits = Arc::new(Semaphore::new(config.max_clients));

    Ok(ServerContext {
        state: server_state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
        connection_permits,
    })
}

fn log_startup_info(config: &Config) {
    info!("Maximum concurrent clients: {}.", config.max_clients);
    info!("Maximum frame size: {} bytes.", config.max_frame_bytes);
    if config.maintenance {
        warn!("Server is starting in MAINTENANCE mode; logins will be refused.");
    }
    if config.restrict_to_private_networks {
        info!("Only peers on private networks will be admitted.");
    }
    if config.create_player.auto_create {
        info!("Commanders will be created automatically on first login.");
    }
}
