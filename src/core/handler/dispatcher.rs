// src/core/handler/dispatcher.rs

//! Defines the `Dispatcher`, a closed table from packet id to handler built once at startup.

use super::{Access, PacketHandler, Reply};
use crate::connection::Session;
use crate::core::metrics;
use crate::core::protocol::{DisconnectReason, Frame};
use crate::core::state::ServerState;
use crate::core::AnchorageError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info_span, warn};

/// One registered command.
#[derive(Clone)]
pub struct HandlerEntry {
    pub packet_id: u16,
    pub name: &'static str,
    pub access: Access,
    pub handler: Arc<dyn PacketHandler>,
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("packet_id", &self.packet_id)
            .field("name", &self.name)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Collects handler registrations, rejecting duplicate packet ids.
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    entries: HashMap<u16, HandlerEntry>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        packet_id: u16,
        name: &'static str,
        access: Access,
        handler: Arc<dyn PacketHandler>,
    ) -> Result<Self, AnchorageError> {
        if self.entries.contains_key(&packet_id) {
            return Err(AnchorageError::DuplicateHandler(packet_id));
        }
        self.entries.insert(
            packet_id,
            HandlerEntry {
                packet_id,
                name,
                access,
                handler,
            },
        );
        Ok(self)
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            entries: self.entries,
        }
    }
}

/// How a single `dispatch` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The handler ran and its responses are queued on the session.
    Handled(Reply),
    /// The handler returned an error; anything it queued was discarded.
    Failed(AnchorageError),
    /// No handler is registered for the packet id.
    Unknown(u16),
    /// The handler requires login and the session is not bound to an account.
    Unauthenticated(u16),
    /// The session was already closed, so the frame was ignored.
    SessionClosed,
}

/// Routes frames to handlers. Immutable after construction.
#[derive(Debug, Default)]
pub struct Dispatcher {
    entries: HashMap<u16, HandlerEntry>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, packet_id: u16) -> Option<&HandlerEntry> {
        self.entries.get(&packet_id)
    }

    /// Runs the handler registered for `frame` against `session`.
    ///
    /// Frames queued by a failing handler are rolled back, so a response only
    /// reaches the socket when its handler succeeds. Only connection-fatal errors
    /// close the session; everything else is logged and the session stays open.
    pub async fn dispatch(
        &self,
        state: &Arc<ServerState>,
        session: &Arc<Session>,
        frame: Frame,
    ) -> DispatchOutcome {
        if session.is_closed() {
            return DispatchOutcome::SessionClosed;
        }
        session.set_packet_index(frame.packet_index);

        let Some(entry) = self.entries.get(&frame.packet_id) else {
            warn!(
                packet = frame.packet_id,
                session = session.id(),
                "no handler registered for packet, dropping"
            );
            metrics::UNKNOWN_PACKETS_TOTAL.inc();
            return DispatchOutcome::Unknown(frame.packet_id);
        };

        if entry.access == Access::Authenticated && !session.is_authenticated() {
            warn!(
                packet = frame.packet_id,
                session = session.id(),
                "packet requires login, dropping"
            );
            return DispatchOutcome::Unauthenticated(frame.packet_id);
        }

        let span = info_span!(
            "packet",
            id = frame.packet_id,
            name = entry.name,
            session = session.id(),
            index = frame.packet_index,
        );

        async move {
            let start_time = Instant::now();
            session.stats().record_packet();
            state.stats.increment_total_packets();
            metrics::PACKETS_DISPATCHED_TOTAL.inc();

            let checkpoint = session.outbound_checkpoint();
            let result = entry.handler.handle(frame.payload, session, state).await;

            let latency = start_time.elapsed();
            metrics::HANDLER_LATENCY_SECONDS.observe(latency.as_secs_f64());
            debug!(elapsed_us = latency.as_micros() as u64, "handler finished");

            match result {
                Ok(reply) => DispatchOutcome::Handled(reply),
                Err(e) => {
                    session.rollback_outbound(checkpoint);
                    session.stats().record_handler_error();
                    metrics::HANDLER_ERRORS_TOTAL.inc();
                    match e.result_kind() {
                        Some(kind) => warn!(
                            "handler for packet {} rejected without replying: {}",
                            entry.packet_id, kind
                        ),
                        None => error!("handler for packet {} failed: {}", entry.packet_id, e),
                    }
                    if e.is_fatal_to_connection() {
                        session.close(Some(DisconnectReason::ConnectionLost));
                    }
                    DispatchOutcome::Failed(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}
