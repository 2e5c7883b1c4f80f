// src/core/mod.rs

//! The central module containing the protocol, dispatch, and persistence logic of Anchorage.

pub mod commands;
pub mod errors;
pub mod handler;
pub mod metrics;
pub mod persistence;
pub mod protocol;
pub mod result_kind;
pub mod state;

pub use errors::AnchorageError;
pub use protocol::{Frame, FrameCodec};
pub use result_kind::ResultKind;
