// src/core/protocol/messages.rs

//! Payload schemas for the packets the core itself understands.
//!
//! These are proto2 messages. Request types are named after the client-to-server
//! packet id (`Cs*`) and response types after the server-to-client id (`Sc*`).

/// Numeric packet ids.
pub mod ids {
    pub const CS_JOIN_SERVER: u16 = 10022;
    pub const SC_JOIN_SERVER: u16 = 10023;
    pub const CS_HEARTBEAT: u16 = 10100;
    pub const SC_HEARTBEAT: u16 = 10101;
    pub const SC_DISCONNECT: u16 = 10999;
    pub const CS_SHOP_PURCHASE: u16 = 16001;
    pub const SC_SHOP_PURCHASE: u16 = 16002;
    pub const CS_CLAIM_AWARD: u16 = 17005;
    pub const SC_CLAIM_AWARD: u16 = 17006;
}

/// Login request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cs10022 {
    #[prost(uint32, required, tag = "1")]
    pub account_id: u32,
    #[prost(string, optional, tag = "2")]
    pub server_ticket: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "3")]
    pub platform: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "4")]
    pub device_id: ::core::option::Option<::prost::alloc::string::String>,
}

/// Login response. `user_id == 0` tells the client no commander is bound.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sc10023 {
    #[prost(uint32, required, tag = "1")]
    pub result: u32,
    #[prost(uint32, required, tag = "2")]
    pub user_id: u32,
    #[prost(string, required, tag = "3")]
    pub server_ticket: ::prost::alloc::string::String,
    #[prost(uint32, required, tag = "4")]
    pub server_load: u32,
    #[prost(uint32, optional, tag = "5")]
    pub db_load: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cs10100 {
    #[prost(uint32, required, tag = "1")]
    pub need_request: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sc10101 {
    #[prost(uint32, required, tag = "1")]
    pub state: u32,
}

/// Disconnect notification sent right before the server drops a connection.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sc10999 {
    #[prost(uint32, required, tag = "1")]
    pub reason: u32,
}

/// One granted line in a response: a resource (`kind = 1`) or an item (`kind = 2`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DropInfo {
    #[prost(uint32, required, tag = "1")]
    pub kind: u32,
    #[prost(uint32, required, tag = "2")]
    pub id: u32,
    #[prost(uint32, required, tag = "3")]
    pub count: u32,
}

/// Shop purchase. `cache_version` is the offer version the client rendered.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cs16001 {
    #[prost(uint32, required, tag = "1")]
    pub offer_id: u32,
    #[prost(uint32, required, tag = "2")]
    pub count: u32,
    #[prost(uint32, required, tag = "3")]
    pub cache_version: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sc16002 {
    #[prost(uint32, required, tag = "1")]
    pub result: u32,
    #[prost(message, repeated, tag = "2")]
    pub drop_list: ::prost::alloc::vec::Vec<DropInfo>,
    #[prost(uint32, optional, tag = "3")]
    pub remaining_stock: ::core::option::Option<u32>,
}

/// Claim the award at `award_index` on an award track.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cs17005 {
    #[prost(uint32, required, tag = "1")]
    pub track_id: u32,
    #[prost(uint32, required, tag = "2")]
    pub award_index: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sc17006 {
    #[prost(uint32, required, tag = "1")]
    pub result: u32,
    #[prost(message, repeated, tag = "2")]
    pub drop_list: ::prost::alloc::vec::Vec<DropInfo>,
}
