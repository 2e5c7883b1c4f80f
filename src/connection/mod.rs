// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: frame reading,
//! dispatch, outbound flushing, and session teardown.

mod guard;
mod handler;
mod session;

pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::{Session, SessionStats, SessionStatsSnapshot};
