// src/core/errors.rs

//! Defines the primary error type for the entire application.

use super::result_kind::ResultKind;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within the server.
#[derive(Error, Debug)]
pub enum AnchorageError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// The inbound byte stream cannot be split into frames. Always fatal for the connection.
    #[error("Framing error: {0}")]
    Framing(String),

    /// A payload did not match the schema the handler expected.
    #[error("Payload decode error: {0}")]
    Decode(String),

    #[error("Payload encode error: {0}")]
    Encode(String),

    #[error("A handler is already registered for packet {0}")]
    DuplicateHandler(u16),

    #[error("Packet {0} requires an authenticated session")]
    NotAuthenticated(u16),

    /// A business rule refused the command. Raised inside a transaction so that
    /// everything done so far is rolled back, then reported in-band.
    #[error("Rejected: {0}")]
    Rejected(ResultKind),

    #[error("Session is closed")]
    SessionClosed,

    /// The server is refusing new sessions (maintenance or connections disabled).
    #[error("Server is not admitting sessions")]
    NotAdmitting,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AnchorageError {
    /// Errors that leave the byte stream in an unknown state. Only these close a session.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(self, AnchorageError::Framing(_) | AnchorageError::Io(_))
    }

    /// The in-band result code for errors that represent a business outcome.
    pub fn result_kind(&self) -> Option<ResultKind> {
        match self {
            AnchorageError::Rejected(kind) => Some(*kind),
            _ => None,
        }
    }
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for AnchorageError {
    fn clone(&self) -> Self {
        match self {
            AnchorageError::Io(e) => AnchorageError::Io(Arc::clone(e)),
            AnchorageError::Framing(s) => AnchorageError::Framing(s.clone()),
            AnchorageError::Decode(s) => AnchorageError::Decode(s.clone()),
            AnchorageError::Encode(s) => AnchorageError::Encode(s.clone()),
            AnchorageError::DuplicateHandler(id) => AnchorageError::DuplicateHandler(*id),
            AnchorageError::NotAuthenticated(id) => AnchorageError::NotAuthenticated(*id),
            AnchorageError::Rejected(kind) => AnchorageError::Rejected(*kind),
            AnchorageError::SessionClosed => AnchorageError::SessionClosed,
            AnchorageError::NotAdmitting => AnchorageError::NotAdmitting,
            AnchorageError::Store(s) => AnchorageError::Store(s.clone()),
            AnchorageError::Internal(s) => AnchorageError::Internal(s.clone()),
        }
    }
}

impl PartialEq for AnchorageError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AnchorageError::Io(e1), AnchorageError::Io(e2)) => e1.to_string() == e2.to_string(),
            (AnchorageError::Framing(s1), AnchorageError::Framing(s2)) => s1 == s2,
            (AnchorageError::Decode(s1), AnchorageError::Decode(s2)) => s1 == s2,
            (AnchorageError::Encode(s1), AnchorageError::Encode(s2)) => s1 == s2,
            (AnchorageError::DuplicateHandler(a), AnchorageError::DuplicateHandler(b)) => a == b,
            (AnchorageError::NotAuthenticated(a), AnchorageError::NotAuthenticated(b)) => a == b,
            (AnchorageError::Rejected(a), AnchorageError::Rejected(b)) => a == b,
            (AnchorageError::Store(s1), AnchorageError::Store(s2)) => s1 == s2,
            (AnchorageError::Internal(s1), AnchorageError::Internal(s2)) => s1 == s2,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for AnchorageError {
    fn from(e: std::io::Error) -> Self {
        AnchorageError::Io(Arc::new(e))
    }
}

impl From<prost::DecodeError> for AnchorageError {
    fn from(e: prost::DecodeError) -> Self {
        AnchorageError::Decode(e.to_string())
    }
}

impl From<prost::EncodeError> for AnchorageError {
    fn from(e: prost::EncodeError) -> Self {
        AnchorageError::Encode(e.to_string())
    }
}

impl From<rusqlite::Error> for AnchorageError {
    fn from(e: rusqlite::Error) -> Self {
        AnchorageError::Store(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AnchorageError {
    fn from(e: tokio::task::JoinError) -> Self {
        AnchorageError::Internal(format!("Blocking task failed: {e}"))
    }
}

impl From<ResultKind> for AnchorageError {
    fn from(kind: ResultKind) -> Self {
        AnchorageError::Rejected(kind)
    }
}
