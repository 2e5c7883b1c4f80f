// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::admission::is_private_peer;
use super::context::ServerContext;
use crate::connection::{ConnectionHandler, Session};
use crate::core::metrics;
use crate::core::protocol::DisconnectReason;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How long live connections get to flush their disconnect notice on shutdown.
const CLIENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The main server loop. Runs until SIGINT or SIGTERM.
pub async fn run(ctx: ServerContext) {
    run_until(ctx, shutdown_signal()).await;
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to register SIGINT handler: {}", e);
            return std::future::pending().await;
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            sigint.recv().await;
            return;
        }
    };
    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown."),
        _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown."),
    }
}

/// Accepts connections until `shutdown` resolves, then closes every session with
/// `ConnectionToServerLost` and waits for the connection tasks to drain.
pub async fn run_until<F>(mut ctx: ServerContext, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut session_id_counter: u64 = 0;
    let mut client_tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        session_id_counter = session_id_counter.wrapping_add(1);
                        accept_connection(&ctx, &mut client_tasks, socket, addr, session_id_counter);
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                }
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res {
                    if e.is_panic() {
                        error!("A client handler panicked: {e:?}");
                    }
                }
            },
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    let closed = ctx.state.disconnect_all(DisconnectReason::ConnectionToServerLost);
    debug!("{} sessions closed for shutdown.", closed);
    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No task was listening for the shutdown signal.");
    }

    if tokio::time::timeout(CLIENT_DRAIN_TIMEOUT, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for client connections to close; aborting the rest.");
        client_tasks.shutdown().await;
    }
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Server shutdown complete.");
}

/// Applies the accept-time admission checks and spawns the connection task.
fn accept_connection(
    ctx: &ServerContext,
    client_tasks: &mut JoinSet<()>,
    socket: TcpStream,
    addr: SocketAddr,
    session_id: u64,
) {
    ctx.state.stats.increment_total_connections();
    metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

    if ctx.state.config.restrict_to_private_networks && !is_private_peer(&addr.ip()) {
        warn!("Rejecting connection from non-private address {}", addr);
        reject(ctx, "non_private");
        return;
    }

    let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
        warn!(
            "Rejecting connection from {}: max_clients ({}) reached.",
            addr, ctx.state.config.max_clients
        );
        reject(ctx, "max_clients");
        return;
    };

    if let Err(e) = socket.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
    }

    info!("Accepted new connection from: {}", addr);
    let session = Arc::new(Session::new(session_id, addr));
    let state = ctx.state.clone();
    let global_shutdown_rx = ctx.shutdown_tx.subscribe();

    client_tasks.spawn(async move {
        let handler = ConnectionHandler::new(socket, session, state, global_shutdown_rx);
        if let Err(e) = handler.run().await {
            warn!("Connection from {} terminated unexpectedly: {}", addr, e);
        }
        drop(permit);
    });
}

fn reject(ctx: &ServerContext, reason: &str) {
    ctx.state.stats.increment_rejected_connections();
    metrics::CONNECTIONS_REJECTED_TOTAL
        .with_label_values(&[reason])
        .inc();
}
