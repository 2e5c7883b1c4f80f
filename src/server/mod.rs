// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;

mod admission;
mod connection_loop;
mod context;
mod initialization;
mod metrics_server;
mod spawner;

pub use admission::is_private_peer;
pub use connection_loop::run_until;
pub use context::ServerContext;
pub use initialization::{setup, setup_with_state};
pub use spawner::spawn_all;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Initialize server state, store and listener.
    let mut server_context = initialization::setup(config).await?;

    // 2. Spawn all background tasks.
    spawner::spawn_all(&mut server_context);

    // 3. Start the main connection acceptance loop. This function will run until shutdown.
    connection_loop::run(server_context).await;

    Ok(())
}
