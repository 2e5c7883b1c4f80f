// src/core/persistence/ledger.rs

//! Row-level reads and guarded writes over the economic tables.
//!
//! Every write that can fail for business reasons is a conditional statement whose
//! affected-row count is the verdict. Callers must run these inside
//! [`Store::with_transaction`](super::Store::with_transaction).

use crate::core::AnchorageError;
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commander {
    pub commander_id: u32,
    pub account_id: u32,
    pub name: String,
    pub banned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopOffer {
    pub offer_id: u32,
    pub resource_id: u32,
    pub price: u32,
    pub item_id: u32,
    pub item_count: u32,
    pub stock: u32,
    pub version: u32,
}

/// Whether an award line grants a resource or an item.
pub const AWARD_KIND_RESOURCE: u32 = 1;
pub const AWARD_KIND_ITEM: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardLine {
    pub track_id: u32,
    pub award_index: u32,
    pub line: u32,
    pub kind: u32,
    pub target_id: u32,
    pub count: u32,
}

/// Resources and items given to a newly created commander.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarterKit {
    pub resources: Vec<(u32, u32)>,
    pub items: Vec<(u32, u32)>,
}

pub fn find_commander(conn: &Connection, account_id: u32) -> Result<Option<Commander>, AnchorageError> {
    let commander = conn
        .query_row(
            "SELECT commander_id, account_id, name, banned FROM commanders WHERE account_id = ?1",
            params![account_id],
            |row| {
                Ok(Commander {
                    commander_id: row.get(0)?,
                    account_id: row.get(1)?,
                    name: row.get(2)?,
                    banned: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(commander)
}

/// Creates the commander for `account_id` and hands out the starter kit.
/// The commander id equals the account id.
pub fn create_commander(
    conn: &Connection,
    account_id: u32,
    name: &str,
    starter: &StarterKit,
) -> Result<Commander, AnchorageError> {
    conn.execute(
        "INSERT INTO commanders (commander_id, account_id, name) VALUES (?1, ?1, ?2)",
        params![account_id, name],
    )?;
    for &(resource_id, amount) in &starter.resources {
        conn.execute(
            "INSERT INTO owned_resources (commander_id, resource_id, amount) VALUES (?1, ?2, ?3)
             ON CONFLICT(commander_id, resource_id) DO UPDATE SET amount = excluded.amount",
            params![account_id, resource_id, amount],
        )?;
    }
    for &(item_id, count) in &starter.items {
        grant_item(conn, account_id, item_id, count)?;
    }
    Ok(Commander {
        commander_id: account_id,
        account_id,
        name: name.to_string(),
        banned: false,
    })
}

/// The account a device last logged in with, if it has one.
pub fn account_for_device(conn: &Connection, device_id: &str) -> Result<Option<u32>, AnchorageError> {
    let account = conn
        .query_row(
            "SELECT account_id FROM device_accounts WHERE device_id = ?1",
            params![device_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(account)
}

pub fn remember_device(conn: &Connection, device_id: &str, account_id: u32) -> Result<(), AnchorageError> {
    conn.execute(
        "INSERT INTO device_accounts (device_id, account_id) VALUES (?1, ?2)
         ON CONFLICT(device_id) DO UPDATE SET account_id = excluded.account_id",
        params![device_id, account_id],
    )?;
    Ok(())
}

pub fn set_banned(conn: &Connection, commander_id: u32, banned: bool) -> Result<bool, AnchorageError> {
    let rows = conn.execute(
        "UPDATE commanders SET banned = ?2 WHERE commander_id = ?1",
        params![commander_id, banned],
    )?;
    Ok(rows == 1)
}

pub fn resource_amount(conn: &Connection, commander_id: u32, resource_id: u32) -> Result<u32, AnchorageError> {
    let amount = conn
        .query_row(
            "SELECT amount FROM owned_resources WHERE commander_id = ?1 AND resource_id = ?2",
            params![commander_id, resource_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(amount.unwrap_or(0))
}

pub fn item_count(conn: &Connection, commander_id: u32, item_id: u32) -> Result<u32, AnchorageError> {
    let count = conn
        .query_row(
            "SELECT count FROM commander_items WHERE commander_id = ?1 AND item_id = ?2",
            params![commander_id, item_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(count.unwrap_or(0))
}

/// Subtracts `amount` only if the balance covers it. `false` means insufficient funds.
pub fn debit_resource(
    conn: &Connection,
    commander_id: u32,
    resource_id: u32,
    amount: u32,
) -> Result<bool, AnchorageError> {
    if amount == 0 {
        return Ok(true);
    }
    let rows = conn.execute(
        "UPDATE owned_resources SET amount = amount - ?3
         WHERE commander_id = ?1 AND resource_id = ?2 AND amount >= ?3",
        params![commander_id, resource_id, amount],
    )?;
    Ok(rows == 1)
}

pub fn credit_resource(
    conn: &Connection,
    commander_id: u32,
    resource_id: u32,
    amount: u32,
) -> Result<(), AnchorageError> {
    conn.execute(
        "INSERT INTO owned_resources (commander_id, resource_id, amount) VALUES (?1, ?2, ?3)
         ON CONFLICT(commander_id, resource_id) DO UPDATE SET amount = amount + excluded.amount",
        params![commander_id, resource_id, amount],
    )?;
    Ok(())
}

pub fn grant_item(
    conn: &Connection,
    commander_id: u32,
    item_id: u32,
    count: u32,
) -> Result<(), AnchorageError> {
    conn.execute(
        "INSERT INTO commander_items (commander_id, item_id, count) VALUES (?1, ?2, ?3)
         ON CONFLICT(commander_id, item_id) DO UPDATE SET count = count + excluded.count",
        params![commander_id, item_id, count],
    )?;
    Ok(())
}

pub fn find_offer(conn: &Connection, offer_id: u32) -> Result<Option<ShopOffer>, AnchorageError> {
    let offer = conn
        .query_row(
            "SELECT offer_id, resource_id, price, item_id, item_count, stock, version
             FROM shop_offers WHERE offer_id = ?1",
            params![offer_id],
            |row| {
                Ok(ShopOffer {
                    offer_id: row.get(0)?,
                    resource_id: row.get(1)?,
                    price: row.get(2)?,
                    item_id: row.get(3)?,
                    item_count: row.get(4)?,
                    stock: row.get(5)?,
                    version: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(offer)
}

/// Inserts or replaces an offer definition. Used by seeding and operators.
pub fn upsert_offer(conn: &Connection, offer: &ShopOffer) -> Result<(), AnchorageError> {
    conn.execute(
        "INSERT INTO shop_offers (offer_id, resource_id, price, item_id, item_count, stock, version)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(offer_id) DO UPDATE SET
             resource_id = excluded.resource_id,
             price = excluded.price,
             item_id = excluded.item_id,
             item_count = excluded.item_count,
             stock = excluded.stock,
             version = excluded.version",
        params![
            offer.offer_id,
            offer.resource_id,
            offer.price,
            offer.item_id,
            offer.item_count,
            offer.stock,
            offer.version
        ],
    )?;
    Ok(())
}

/// Compare-and-decrement on the offer's stock. `false` means not enough left.
pub fn take_stock(conn: &Connection, offer_id: u32, count: u32) -> Result<bool, AnchorageError> {
    let rows = conn.execute(
        "UPDATE shop_offers SET stock = stock - ?2 WHERE offer_id = ?1 AND stock >= ?2",
        params![offer_id, count],
    )?;
    Ok(rows == 1)
}

pub fn offer_stock(conn: &Connection, offer_id: u32) -> Result<Option<u32>, AnchorageError> {
    let stock = conn
        .query_row(
            "SELECT stock FROM shop_offers WHERE offer_id = ?1",
            params![offer_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(stock)
}

pub fn award_lines(
    conn: &Connection,
    track_id: u32,
    award_index: u32,
) -> Result<Vec<AwardLine>, AnchorageError> {
    let mut stmt = conn.prepare_cached(
        "SELECT track_id, award_index, line, kind, target_id, count
         FROM award_lines WHERE track_id = ?1 AND award_index = ?2 ORDER BY line",
    )?;
    let lines = stmt
        .query_map(params![track_id, award_index], |row| {
            Ok(AwardLine {
                track_id: row.get(0)?,
                award_index: row.get(1)?,
                line: row.get(2)?,
                kind: row.get(3)?,
                target_id: row.get(4)?,
                count: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(lines)
}

pub fn insert_award_line(conn: &Connection, line: &AwardLine) -> Result<(), AnchorageError> {
    conn.execute(
        "INSERT OR REPLACE INTO award_lines (track_id, award_index, line, kind, target_id, count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            line.track_id,
            line.award_index,
            line.line,
            line.kind,
            line.target_id,
            line.count
        ],
    )?;
    Ok(())
}

pub fn last_award_index(conn: &Connection, commander_id: u32, track_id: u32) -> Result<u32, AnchorageError> {
    let index = conn
        .query_row(
            "SELECT last_award_index FROM award_progress WHERE commander_id = ?1 AND track_id = ?2",
            params![commander_id, track_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(index.unwrap_or(0))
}

/// Advances the commander's progress on `track_id` from `award_index - 1` to
/// `award_index`. Returns `true` only for the single caller that made the move.
pub fn try_advance_award(
    conn: &Connection,
    commander_id: u32,
    track_id: u32,
    award_index: u32,
) -> Result<bool, AnchorageError> {
    if award_index == 0 {
        return Ok(false);
    }
    let rows = conn.execute(
        "UPDATE award_progress SET last_award_index = ?3
         WHERE commander_id = ?1 AND track_id = ?2 AND last_award_index = ?3 - 1",
        params![commander_id, track_id, award_index],
    )?;
    if rows == 1 {
        return Ok(true);
    }
    if award_index != 1 {
        return Ok(false);
    }
    let rows = conn.execute(
        "INSERT INTO award_progress (commander_id, track_id, last_award_index) VALUES (?1, ?2, 1)
         ON CONFLICT(commander_id, track_id) DO UPDATE SET last_award_index = 1
         WHERE award_progress.last_award_index = 0",
        params![commander_id, track_id],
    )?;
    Ok(rows == 1)
}
