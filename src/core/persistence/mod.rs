// src/core/persistence/mod.rs

//! The relational store and the transactional helpers handlers build on.

pub mod effects;
pub mod ledger;
pub mod schema;
mod store;

pub use effects::{Effect, apply_all};
pub use store::{IN_MEMORY, Store};
