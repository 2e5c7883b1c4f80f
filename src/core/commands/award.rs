// src/core/commands/award.rs

//! Award tracks: claim tier `n` once, only after tier `n - 1`, and receive every
//! line of the tier or nothing.

use super::helpers::{decode_payload, require_commander};
use crate::connection::Session;
use crate::core::handler::{PacketHandler, Reply};
use crate::core::persistence::effects::{self, Effect};
use crate::core::persistence::ledger;
use crate::core::protocol::messages::{Cs17005, DropInfo, Sc17006, ids};
use crate::core::state::ServerState;
use crate::core::{AnchorageError, ResultKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ClaimAward;

#[async_trait]
impl PacketHandler for ClaimAward {
    async fn handle(
        &self,
        payload: Bytes,
        session: &Arc<Session>,
        state: &Arc<ServerState>,
    ) -> Result<Reply, AnchorageError> {
        let Cs17005 {
            track_id,
            award_index,
        } = decode_payload(&payload)?;
        let commander_id = require_commander(session, ids::CS_CLAIM_AWARD)?;

        let outcome = if award_index == 0 {
            Err(AnchorageError::Rejected(ResultKind::InvalidRequest))
        } else {
            state
                .store
                .with_transaction(move |tx| {
                    let lines = ledger::award_lines(tx, track_id, award_index)?;
                    if lines.is_empty() {
                        return Err(ResultKind::NotFound.into());
                    }

                    // The guard is recorded in the same transaction as the grants.
                    effects::apply(
                        tx,
                        commander_id,
                        &Effect::ClaimAward {
                            track_id,
                            award_index,
                        },
                    )?;

                    let mut drops = Vec::with_capacity(lines.len());
                    for line in &lines {
                        effects::apply(tx, commander_id, &Effect::from_award_line(line)?)?;
                        drops.push(DropInfo {
                            kind: line.kind,
                            id: line.target_id,
                            count: line.count,
                        });
                    }
                    Ok(drops)
                })
                .await
        };

        let response = match outcome {
            Ok(drop_list) => {
                info!(
                    commander = commander_id,
                    track = track_id,
                    index = award_index,
                    "award claimed"
                );
                Sc17006 {
                    result: ResultKind::Success.code(),
                    drop_list,
                }
            }
            Err(AnchorageError::Rejected(kind)) => {
                debug!(
                    commander = commander_id,
                    track = track_id,
                    index = award_index,
                    "award claim rejected: {}",
                    kind
                );
                Sc17006 {
                    result: kind.code(),
                    drop_list: Vec::new(),
                }
            }
            Err(e) => return Err(e),
        };

        let written = session.send_message(ids::SC_CLAIM_AWARD, &response)?;
        Ok(Reply::new(written, ids::SC_CLAIM_AWARD))
    }
}
