// src/core/state/mod.rs

//! Defines the central `ServerState` struct and the session registry it owns.

mod core;
mod registry;
mod stats;

pub use core::ServerState;
pub use registry::{BindOutcome, SessionRegistry};
pub use stats::StatsState;
