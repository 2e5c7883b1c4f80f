// src/core/protocol/mod.rs

//! Wire-level types: frame codec, disconnect reasons, and payload schemas.

mod disconnect;
pub mod frame;
pub mod messages;

pub use disconnect::DisconnectReason;
pub use frame::{Decoded, Frame, FrameCodec, HEADER_LEN, MAX_FRAME_LEN, MAX_PAYLOAD_LEN};
