// src/core/persistence/effects.rs

//! The state changes a command may propose, applied all-or-nothing.

use super::ledger::{self, AWARD_KIND_ITEM, AWARD_KIND_RESOURCE, AwardLine};
use crate::core::{AnchorageError, ResultKind};
use rusqlite::Connection;

/// One economic operation against a commander's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    DebitResource { resource_id: u32, amount: u32 },
    CreditResource { resource_id: u32, amount: u32 },
    GrantItem { item_id: u32, count: u32 },
    /// Decrement an offer's stock; fails with `StockExhausted` when short.
    TakeStock { offer_id: u32, count: u32 },
    /// Record that an award was claimed; fails with `AlreadyClaimed` on a repeat.
    ClaimAward { track_id: u32, award_index: u32 },
}

impl Effect {
    /// Builds the grant effect for an award line.
    pub fn from_award_line(line: &AwardLine) -> Result<Self, AnchorageError> {
        match line.kind {
            AWARD_KIND_RESOURCE => Ok(Effect::CreditResource {
                resource_id: line.target_id,
                amount: line.count,
            }),
            AWARD_KIND_ITEM => Ok(Effect::GrantItem {
                item_id: line.target_id,
                count: line.count,
            }),
            _ => Err(AnchorageError::Rejected(ResultKind::Failed)),
        }
    }
}

/// Applies a single effect. Business failures surface as [`AnchorageError::Rejected`]
/// so the enclosing transaction rolls back.
pub fn apply(conn: &Connection, commander_id: u32, effect: &Effect) -> Result<(), AnchorageError> {
    match *effect {
        Effect::DebitResource {
            resource_id,
            amount,
        } => {
            if !ledger::debit_resource(conn, commander_id, resource_id, amount)? {
                return Err(ResultKind::InsufficientResources.into());
            }
        }
        Effect::CreditResource {
            resource_id,
            amount,
        } => ledger::credit_resource(conn, commander_id, resource_id, amount)?,
        Effect::GrantItem { item_id, count } => {
            ledger::grant_item(conn, commander_id, item_id, count)?
        }
        Effect::TakeStock { offer_id, count } => {
            if !ledger::take_stock(conn, offer_id, count)? {
                return Err(ResultKind::StockExhausted.into());
            }
        }
        Effect::ClaimAward {
            track_id,
            award_index,
        } => {
            if !ledger::try_advance_award(conn, commander_id, track_id, award_index)? {
                let last = ledger::last_award_index(conn, commander_id, track_id)?;
                let kind = if last >= award_index {
                    ResultKind::AlreadyClaimed
                } else {
                    ResultKind::InvalidRequest
                };
                return Err(kind.into());
            }
        }
    }
    Ok(())
}

/// Applies `effects` in order. The first failure stops the sequence.
pub fn apply_all(
    conn: &Connection,
    commander_id: u32,
    effects: &[Effect],
) -> Result<(), AnchorageError> {
    effects
        .iter()
        .try_for_each(|effect| apply(conn, commander_id, effect))
}
