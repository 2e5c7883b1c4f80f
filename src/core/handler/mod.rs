// src/core/handler/mod.rs

//! The seam between the transport and command logic: the handler contract and the
//! dispatcher that routes decoded frames to registered handlers.

mod dispatcher;

pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder, HandlerEntry};

use crate::connection::Session;
use crate::core::AnchorageError;
use crate::core::state::ServerState;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Who may invoke a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Usable before login, e.g. the login command itself or heartbeats.
    Public,
    /// Requires the session to be bound to an account.
    Authenticated,
}

/// What a handler reports back after a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Bytes queued on the session. Informational only.
    pub bytes_written: usize,
    /// The response packet id the handler answered with.
    pub packet_id: u16,
}

impl Reply {
    pub fn new(bytes_written: usize, packet_id: u16) -> Self {
        Self {
            bytes_written,
            packet_id,
        }
    }
}

/// Implemented by every command handler.
///
/// A handler decodes `payload`, does its work (mutating shared state only through
/// [`Store::with_transaction`](crate::core::persistence::Store::with_transaction)),
/// and queues responses with [`Session::send_message`]. A handler that fails to
/// decode its payload must return an error without sending anything.
#[async_trait]
pub trait PacketHandler: Send + Sync {
    async fn handle(
        &self,
        payload: Bytes,
        session: &Arc<Session>,
        state: &Arc<ServerState>,
    ) -> Result<Reply, AnchorageError>;
}
