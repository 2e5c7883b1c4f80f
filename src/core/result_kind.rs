// src/core/result_kind.rs

//! The closed set of in-band outcomes a command can report to the client.

use std::fmt;

/// Business outcome of a command, carried as the numeric `result` field of a response.
///
/// `Success` is always `0`. Every other variant is a failure the client can branch on;
/// none of them tear down the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResultKind {
    Success = 0,
    Failed = 1,
    InsufficientResources = 2,
    StaleCache = 3,
    StockExhausted = 4,
    AlreadyClaimed = 5,
    NotFound = 6,
    InvalidRequest = 7,
    Banned = 17,
}

impl ResultKind {
    /// The wire value written into a response's `result` field.
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub const fn is_success(self) -> bool {
        matches!(self, ResultKind::Success)
    }

    /// Maps a wire value back to its variant. Unknown codes collapse to `Failed`.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ResultKind::Success,
            2 => ResultKind::InsufficientResources,
            3 => ResultKind::StaleCache,
            4 => ResultKind::StockExhausted,
            5 => ResultKind::AlreadyClaimed,
            6 => ResultKind::NotFound,
            7 => ResultKind::InvalidRequest,
            17 => ResultKind::Banned,
            _ => ResultKind::Failed,
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultKind::Success => "success",
            ResultKind::Failed => "failed",
            ResultKind::InsufficientResources => "insufficient resources",
            ResultKind::StaleCache => "stale cache",
            ResultKind::StockExhausted => "stock exhausted",
            ResultKind::AlreadyClaimed => "already claimed",
            ResultKind::NotFound => "not found",
            ResultKind::InvalidRequest => "invalid request",
            ResultKind::Banned => "banned",
        };
        write!(f, "{name} ({})", self.code())
    }
}
