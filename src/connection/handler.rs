// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of a client connection.

use super::Session;
use super::guard::ConnectionGuard;
use crate::core::handler::DispatchOutcome;
use crate::core::metrics;
use crate::core::protocol::{DisconnectReason, FrameCodec};
use crate::core::state::ServerState;
use crate::core::AnchorageError;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, watch};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

/// Drives one TCP connection: reads frames, dispatches them in arrival order and
/// writes whatever the handlers queued on the session.
pub struct ConnectionHandler {
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    writer: OwnedWriteHalf,
    session: Arc<Session>,
    state: Arc<ServerState>,
    global_shutdown_rx: broadcast::Receiver<()>,
    closed_rx: watch::Receiver<bool>,
    flush_timeout: Duration,
}

impl ConnectionHandler {
    pub fn new(
        socket: TcpStream,
        session: Arc<Session>,
        state: Arc<ServerState>,
        global_shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let codec = FrameCodec::new(state.config.max_frame_bytes);
        let flush_timeout = Duration::from_millis(state.config.close_flush_timeout_ms);
        let (read_half, write_half) = socket.into_split();
        let closed_rx = session.closed_signal();
        Self {
            reader: FramedRead::new(read_half, codec),
            writer: write_half,
            session,
            state,
            global_shutdown_rx,
            closed_rx,
            flush_timeout,
        }
    }

    /// The main event loop for the connection.
    ///
    /// Returns once the peer disconnects, the session is closed from elsewhere
    /// (eviction, kick, maintenance), a fatal error occurs, or the server shuts down.
    /// A closed session gets its disconnect notice flushed before the socket is dropped.
    pub async fn run(mut self) -> Result<(), AnchorageError> {
        let _guard = ConnectionGuard::new(self.state.clone(), self.session.clone());

        if let Err(e) = self.state.registry.register(self.session.clone()) {
            info!(
                "Refusing connection from {}: {} ({:?})",
                self.session.addr(),
                e,
                self.session.close_reason()
            );
            metrics::CONNECTIONS_REJECTED_TOTAL
                .with_label_values(&["not_admitting"])
                .inc();
            self.state.stats.increment_rejected_connections();
            self.finish().await;
            return Ok(());
        }

        loop {
            if self.session.is_closed() {
                break;
            }
            tokio::select! {
                biased;

                _ = self.global_shutdown_rx.recv() => {
                    debug!("Connection {} received global shutdown signal.", self.session.addr());
                    self.session.close(Some(DisconnectReason::ConnectionToServerLost));
                    break;
                }

                _ = self.closed_rx.changed() => {
                    debug!(
                        "Session {} closed ({:?}), ending connection.",
                        self.session.id(),
                        self.session.close_reason()
                    );
                    break;
                }

                result = self.reader.next() => {
                    match result {
                        Some(Ok(frame)) => {
                            let outcome = self
                                .state
                                .dispatcher
                                .dispatch(&self.state, &self.session, frame)
                                .await;
                            if let DispatchOutcome::Failed(e) = &outcome {
                                debug!("Dispatch failed for session {}: {}", self.session.id(), e);
                            }
                            if self.session.is_closed() {
                                break;
                            }
                            if let Err(e) = self.flush().await {
                                if is_normal_disconnect(&e) {
                                    debug!("Connection from {} closed by peer: {}", self.session.addr(), e);
                                } else {
                                    warn!("Write error for {}: {}", self.session.addr(), e);
                                }
                                self.session.close(None);
                                break;
                            }
                        }
                        Some(Err(e @ AnchorageError::Framing(_))) => {
                            warn!("Framing error for {}: {}", self.session.addr(), e);
                            metrics::FRAMING_ERRORS_TOTAL.inc();
                            self.session.close(Some(DisconnectReason::DataValidationFailed));
                            break;
                        }
                        Some(Err(e)) => {
                            // Includes a peer hanging up mid-frame.
                            if matches!(e, AnchorageError::Io(_)) {
                                debug!("Connection from {} closed by peer: {}", self.session.addr(), e);
                            } else {
                                warn!("Read error for {}: {}", self.session.addr(), e);
                            }
                            self.session.close(None);
                            break;
                        }
                        None => {
                            debug!("Connection from {} closed by peer.", self.session.addr());
                            self.session.close(None);
                            break;
                        }
                    }
                }
            }
        }

        self.finish().await;
        Ok(())
    }

    /// Writes everything queued on the session to the socket.
    async fn flush(&mut self) -> Result<(), AnchorageError> {
        let pending = self.session.take_outbound();
        if pending.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.writer.write_all(&pending).await {
            self.session.stats().record_write_error();
            return Err(e.into());
        }
        Ok(())
    }

    /// Best-effort delivery of the disconnect notice, bounded by the flush timeout.
    async fn finish(&mut self) {
        let flush_timeout = self.flush_timeout;
        let delivered = tokio::time::timeout(flush_timeout, async {
            self.flush().await?;
            self.writer.shutdown().await.map_err(AnchorageError::from)
        })
        .await;
        match delivered {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(
                "Could not deliver disconnect notice to {}: {}",
                self.session.addr(),
                e
            ),
            Err(_) => debug!(
                "Timed out delivering disconnect notice to {}",
                self.session.addr()
            ),
        }
    }
}

/// Checks if an error is a common, non-critical network disconnect error.
fn is_normal_disconnect(e: &AnchorageError) -> bool {
    matches!(e, AnchorageError::Io(arc_err) if matches!(
        arc_err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionAborted
    ))
}
