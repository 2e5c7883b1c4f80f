// src/core/commands/helpers.rs

//! Small helpers shared by command handlers for decoding payloads and checking identity.

use crate::connection::Session;
use crate::core::AnchorageError;
use prost::Message;

/// Decodes a handler's request schema. Failures map to [`AnchorageError::Decode`].
pub fn decode_payload<M: Message + Default>(payload: &[u8]) -> Result<M, AnchorageError> {
    Ok(M::decode(payload)?)
}

/// The commander bound to `session`. Commander ids equal account ids.
pub fn require_commander(session: &Session, packet_id: u16) -> Result<u32, AnchorageError> {
    session
        .account()
        .ok_or(AnchorageError::NotAuthenticated(packet_id))
}
