// src/core/commands/shop.rs

//! Shop purchases: one offer, bought `count` times, paid from a resource balance.

use super::helpers::{decode_payload, require_commander};
use crate::connection::Session;
use crate::core::handler::{PacketHandler, Reply};
use crate::core::persistence::ledger::{self, AWARD_KIND_ITEM};
use crate::core::persistence::{Effect, apply_all};
use crate::core::protocol::messages::{Cs16001, DropInfo, Sc16002, ids};
use crate::core::state::ServerState;
use crate::core::{AnchorageError, ResultKind};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Largest `count` accepted in one purchase request.
pub const MAX_PURCHASE_COUNT: u32 = 999;

pub struct ShopPurchase;

struct Receipt {
    drop: DropInfo,
    remaining_stock: u32,
}

#[async_trait]
impl PacketHandler for ShopPurchase {
    async fn handle(
        &self,
        payload: Bytes,
        session: &Arc<Session>,
        state: &Arc<ServerState>,
    ) -> Result<Reply, AnchorageError> {
        let request: Cs16001 = decode_payload(&payload)?;
        let commander_id = require_commander(session, ids::CS_SHOP_PURCHASE)?;
        let Cs16001 {
            offer_id,
            count,
            cache_version,
        } = request;

        let outcome = if count == 0 || count > MAX_PURCHASE_COUNT {
            Err(AnchorageError::Rejected(ResultKind::InvalidRequest))
        } else {
            state
                .store
                .with_transaction(move |tx| {
                    let offer = ledger::find_offer(tx, offer_id)?
                        .ok_or(AnchorageError::Rejected(ResultKind::NotFound))?;
                    if offer.version != cache_version {
                        return Err(ResultKind::StaleCache.into());
                    }
                    let total_price = offer
                        .price
                        .checked_mul(count)
                        .ok_or(AnchorageError::Rejected(ResultKind::InvalidRequest))?;
                    let total_items = offer
                        .item_count
                        .checked_mul(count)
                        .ok_or(AnchorageError::Rejected(ResultKind::InvalidRequest))?;

                    apply_all(
                        tx,
                        commander_id,
                        &[
                            Effect::TakeStock {
                                offer_id: offer.offer_id,
                                count,
                            },
                            Effect::DebitResource {
                                resource_id: offer.resource_id,
                                amount: total_price,
                            },
                            Effect::GrantItem {
                                item_id: offer.item_id,
                                count: total_items,
                            },
                        ],
                    )?;

                    Ok(Receipt {
                        drop: DropInfo {
                            kind: AWARD_KIND_ITEM,
                            id: offer.item_id,
                            count: total_items,
                        },
                        remaining_stock: ledger::offer_stock(tx, offer.offer_id)?.unwrap_or(0),
                    })
                })
                .await
        };

        let response = match outcome {
            Ok(receipt) => Sc16002 {
                result: ResultKind::Success.code(),
                drop_list: vec![receipt.drop],
                remaining_stock: Some(receipt.remaining_stock),
            },
            Err(AnchorageError::Rejected(kind)) => {
                debug!(
                    commander = commander_id,
                    offer = offer_id,
                    "purchase rejected: {}",
                    kind
                );
                Sc16002 {
                    result: kind.code(),
                    drop_list: Vec::new(),
                    remaining_stock: None,
                }
            }
            Err(e) => return Err(e),
        };

        let written = session.send_message(ids::SC_SHOP_PURCHASE, &response)?;
        Ok(Reply::new(written, ids::SC_SHOP_PURCHASE))
    }
}
