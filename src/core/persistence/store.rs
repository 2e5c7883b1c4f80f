// src/core/persistence/store.rs

//! The transactional handle handlers use to reach the relational store.

use super::schema;
use crate::core::AnchorageError;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Path value that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A cloneable handle to one SQLite connection.
///
/// All work runs on tokio's blocking pool so that a slow transaction stalls only
/// the session that issued it.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and applies the schema.
    pub fn open(path: &str) -> Result<Self, AnchorageError> {
        let conn = if path == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
                info!("Created database directory: {}", parent.display());
            }
            let conn = Connection::open(path)?;
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!("SQLite journal mode: {}", mode);
            conn
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, AnchorageError> {
        Self::open(IN_MEMORY)
    }

    /// Runs `f` inside one `BEGIN IMMEDIATE` transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back on any `Err`, including
    /// [`AnchorageError::Rejected`] business outcomes.
    pub async fn with_transaction<F, T>(&self, f: F) -> Result<T, AnchorageError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, AnchorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback() {
                        warn!("Transaction rollback failed: {}", rollback_err);
                    }
                    Err(e)
                }
            }
        })
        .await?
    }

    /// Runs a read-only closure against the connection outside any explicit transaction.
    pub async fn read<F, T>(&self, f: F) -> Result<T, AnchorageError>
    where
        F: FnOnce(&Connection) -> Result<T, AnchorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await?
    }
}
