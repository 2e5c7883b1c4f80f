// src/core/protocol/disconnect.rs

use std::fmt;

/// Why the server is dropping a connection. Sent as the `reason` of `SC_10999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DisconnectReason {
    LoggedInOnAnotherDevice = 1,
    ServerMaintenance = 2,
    GameUpdate = 3,
    OfflineTooLong = 4,
    ConnectionLost = 5,
    ConnectionToServerLost = 6,
    DataValidationFailed = 7,
    LoginDataExpired = 199,
}

impl DisconnectReason {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => DisconnectReason::LoggedInOnAnotherDevice,
            2 => DisconnectReason::ServerMaintenance,
            3 => DisconnectReason::GameUpdate,
            4 => DisconnectReason::OfflineTooLong,
            5 => DisconnectReason::ConnectionLost,
            6 => DisconnectReason::ConnectionToServerLost,
            7 => DisconnectReason::DataValidationFailed,
            199 => DisconnectReason::LoginDataExpired,
            _ => return None,
        })
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DisconnectReason::LoggedInOnAnotherDevice => "logged in on another device",
            DisconnectReason::ServerMaintenance => "server maintenance",
            DisconnectReason::GameUpdate => "game update",
            DisconnectReason::OfflineTooLong => "offline too long",
            DisconnectReason::ConnectionLost => "connection lost",
            DisconnectReason::ConnectionToServerLost => "connection to server lost",
            DisconnectReason::DataValidationFailed => "data validation failed",
            DisconnectReason::LoginDataExpired => "login data expired",
        };
        f.write_str(text)
    }
}
