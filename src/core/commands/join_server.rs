// src/core/commands/join_server.rs

//! Login. Resolves the commander for an account and binds the session to it,
//! evicting any session that held the account before.
//!
//! A client that sends `account_id = 0` is matched to an account through the
//! `device_id` it logged in with last time, when there is one.

use super::helpers::decode_payload;
use crate::connection::Session;
use crate::core::handler::{PacketHandler, Reply};
use crate::core::persistence::ledger;
use crate::core::protocol::messages::{Cs10022, Sc10023, ids};
use crate::core::state::ServerState;
use crate::core::{AnchorageError, ResultKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

pub struct JoinServer;

impl JoinServer {
    fn respond(session: &Session, response: &Sc10023) -> Result<Reply, AnchorageError> {
        let written = session.send_message(ids::SC_JOIN_SERVER, response)?;
        Ok(Reply::new(written, ids::SC_JOIN_SERVER))
    }
}

#[async_trait]
impl PacketHandler for JoinServer {
    async fn handle(
        &self,
        payload: Bytes,
        session: &Arc<Session>,
        state: &Arc<ServerState>,
    ) -> Result<Reply, AnchorageError> {
        let Cs10022 {
            account_id,
            device_id,
            ..
        } = decode_payload(&payload)?;
        let device_id = device_id.filter(|id| !id.is_empty());

        // `user_id = 0` tells the client there is no commander to load.
        let mut response = Sc10023 {
            result: ResultKind::Success.code(),
            user_id: 0,
            server_ticket: state.config.server_ticket.clone(),
            server_load: 0,
            db_load: Some(0),
        };
        if account_id == 0 && device_id.is_none() {
            return Self::respond(session, &response);
        }

        let create_player = &state.config.create_player;
        let auto_create = create_player.auto_create;
        let starter = create_player.starter_kit();
        let commander = state
            .store
            .with_transaction(move |tx| {
                let account_id = match (account_id, device_id.as_deref()) {
                    (0, Some(device)) => ledger::account_for_device(tx, device)?.unwrap_or(0),
                    (id, _) => id,
                };
                if account_id == 0 {
                    return Ok(None);
                }

                let commander = match ledger::find_commander(tx, account_id)? {
                    Some(commander) => Some(commander),
                    None if auto_create => {
                        let name = format!("Commander #{account_id}");
                        Some(ledger::create_commander(tx, account_id, &name, &starter)?)
                    }
                    None => None,
                };
                if let (Some(commander), Some(device)) = (&commander, device_id.as_deref())
                    && !commander.banned
                {
                    ledger::remember_device(tx, device, commander.account_id)?;
                }
                Ok(commander)
            })
            .await?;

        let Some(commander) = commander else {
            info!(account = account_id, "no commander for account");
            return Self::respond(session, &response);
        };
        let account_id = commander.account_id;

        if commander.banned {
            info!(account = account_id, "banned commander attempted to log in");
            response.result = ResultKind::Banned.code();
            return Self::respond(session, &response);
        }

        state.registry.bind(account_id, session)?;
        info!(
            account = account_id,
            session = session.id(),
            "commander logged in"
        );

        response.user_id = commander.commander_id;
        Self::respond(session, &response)
    }
}
