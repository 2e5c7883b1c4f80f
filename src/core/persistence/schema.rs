// src/core/persistence/schema.rs

//! Relational schema for commanders and the economic state handlers mutate.

use rusqlite::Connection;

/// Bumped whenever `SCHEMA` changes shape.
pub const SCHEMA_VERSION: i64 = 2;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS commanders (
    commander_id INTEGER PRIMARY KEY,
    account_id   INTEGER NOT NULL UNIQUE,
    name         TEXT    NOT NULL,
    banned       INTEGER NOT NULL DEFAULT 0,
    created_at   INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);

CREATE TABLE IF NOT EXISTS owned_resources (
    commander_id INTEGER NOT NULL REFERENCES commanders(commander_id) ON DELETE CASCADE,
    resource_id  INTEGER NOT NULL,
    amount       INTEGER NOT NULL DEFAULT 0 CHECK (amount >= 0),
    PRIMARY KEY (commander_id, resource_id)
);

CREATE TABLE IF NOT EXISTS commander_items (
    commander_id INTEGER NOT NULL REFERENCES commanders(commander_id) ON DELETE CASCADE,
    item_id      INTEGER NOT NULL,
    count        INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
    PRIMARY KEY (commander_id, item_id)
);

CREATE TABLE IF NOT EXISTS shop_offers (
    offer_id    INTEGER PRIMARY KEY,
    resource_id INTEGER NOT NULL,
    price       INTEGER NOT NULL CHECK (price >= 0),
    item_id     INTEGER NOT NULL,
    item_count  INTEGER NOT NULL CHECK (item_count > 0),
    stock       INTEGER NOT NULL CHECK (stock >= 0),
    version     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS award_lines (
    track_id    INTEGER NOT NULL,
    award_index INTEGER NOT NULL,
    line        INTEGER NOT NULL,
    kind        INTEGER NOT NULL,
    target_id   INTEGER NOT NULL,
    count       INTEGER NOT NULL CHECK (count > 0),
    PRIMARY KEY (track_id, award_index, line)
);

CREATE TABLE IF NOT EXISTS award_progress (
    commander_id     INTEGER NOT NULL REFERENCES commanders(commander_id) ON DELETE CASCADE,
    track_id         INTEGER NOT NULL,
    last_award_index INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (commander_id, track_id)
);

CREATE TABLE IF NOT EXISTS device_accounts (
    device_id  TEXT    PRIMARY KEY,
    account_id INTEGER NOT NULL
);
";

/// Creates any missing tables. Safe to run on every start.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let current: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    conn.execute_batch(SCHEMA)?;
    if current < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}
