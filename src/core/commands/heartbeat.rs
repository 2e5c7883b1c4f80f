// src/core/commands/heartbeat.rs

use super::helpers::decode_payload;
use crate::connection::Session;
use crate::core::AnchorageError;
use crate::core::handler::{PacketHandler, Reply};
use crate::core::protocol::messages::{Cs10100, Sc10101, ids};
use crate::core::state::ServerState;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Keep-alive. Answers every request with a fixed state.
pub struct Heartbeat;

#[async_trait]
impl PacketHandler for Heartbeat {
    async fn handle(
        &self,
        payload: Bytes,
        session: &Arc<Session>,
        _state: &Arc<ServerState>,
    ) -> Result<Reply, AnchorageError> {
        let _request: Cs10100 = decode_payload(&payload)?;
        let written = session.send_message(ids::SC_HEARTBEAT, &Sc10101 { state: 0 })?;
        Ok(Reply::new(written, ids::SC_HEARTBEAT))
    }
}
