// src/core/commands/mod.rs

//! The built-in command handlers and the table that wires them to packet ids.

pub mod award;
pub mod heartbeat;
pub mod helpers;
pub mod join_server;
pub mod shop;

use crate::core::AnchorageError;
use crate::core::handler::{Access, Dispatcher, DispatcherBuilder};
use crate::core::protocol::messages::ids;
use std::sync::Arc;

pub use award::ClaimAward;
pub use heartbeat::Heartbeat;
pub use join_server::JoinServer;
pub use shop::ShopPurchase;

/// Registers the built-in handlers on `builder`. Feature handlers are added the same way.
pub fn register_builtin(builder: DispatcherBuilder) -> Result<DispatcherBuilder, AnchorageError> {
    builder
        .register(
            ids::CS_JOIN_SERVER,
            "join_server",
            Access::Public,
            Arc::new(JoinServer),
        )?
        .register(ids::CS_HEARTBEAT, "heartbeat", Access::Public, Arc::new(Heartbeat))?
        .register(
            ids::CS_SHOP_PURCHASE,
            "shop_purchase",
            Access::Authenticated,
            Arc::new(ShopPurchase),
        )?
        .register(
            ids::CS_CLAIM_AWARD,
            "claim_award",
            Access::Authenticated,
            Arc::new(ClaimAward),
        )
}

/// The handler table the server starts with.
pub fn default_dispatcher() -> Result<Dispatcher, AnchorageError> {
    Ok(register_builtin(Dispatcher::builder())?.build())
}
