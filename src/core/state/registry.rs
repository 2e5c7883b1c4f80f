// src/core/state/registry.rs

//! The process-wide index of live sessions and the login-kick protocol.

use crate::connection::Session;
use crate::core::AnchorageError;
use crate::core::metrics;
use crate::core::protocol::DisconnectReason;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ACCOUNT_LOCK_SHARDS: usize = 64;

/// Server-wide admission switches, consulted whenever a session is registered or bound.
#[derive(Debug, Clone, Copy)]
struct Gate {
    maintenance: bool,
    accepting: bool,
}

impl Gate {
    fn refusal(&self) -> Option<DisconnectReason> {
        if self.maintenance {
            Some(DisconnectReason::ServerMaintenance)
        } else if !self.accepting {
            Some(DisconnectReason::ConnectionToServerLost)
        } else {
            None
        }
    }
}

/// What a successful [`SessionRegistry::bind`] did to the account's previous owner.
#[derive(Debug)]
pub struct BindOutcome {
    /// The session that held the account before, now closed.
    pub evicted: Option<Arc<Session>>,
}

/// Maps session ids and account ids to live sessions.
///
/// Bind, evict and remove for the same account are serialized by a sharded
/// per-account lock; different accounts proceed in parallel. The gate lock makes
/// maintenance sweeps complete: a session is either inserted before the flag flips
/// (and then swept) or sees the flag and closes itself.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<u64, Arc<Session>>,
    accounts: DashMap<u32, u64>,
    account_locks: Box<[Mutex<()>]>,
    gate: RwLock<Gate>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            accounts: DashMap::new(),
            account_locks: (0..ACCOUNT_LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
            gate: RwLock::new(Gate {
                maintenance: false,
                accepting: true,
            }),
        }
    }

    fn lock_account(&self, account_id: u32) -> MutexGuard<'_, ()> {
        self.account_locks[account_id as usize % ACCOUNT_LOCK_SHARDS].lock()
    }

    /// The reason new sessions are currently refused, if any.
    pub fn admission_refusal(&self) -> Option<DisconnectReason> {
        self.gate.read().refusal()
    }

    pub fn is_maintenance(&self) -> bool {
        self.gate.read().maintenance
    }

    pub fn is_accepting_connections(&self) -> bool {
        self.gate.read().accepting
    }

    /// Tracks a freshly accepted session. If the server is not admitting sessions
    /// the session is closed with the matching reason instead.
    pub fn register(&self, session: Arc<Session>) -> Result<(), AnchorageError> {
        let gate = self.gate.read();
        if let Some(reason) = gate.refusal() {
            drop(gate);
            session.close(Some(reason));
            return Err(AnchorageError::NotAdmitting);
        }
        self.sessions.insert(session.id(), session);
        Ok(())
    }

    /// Binds `account_id` to `session`, evicting whichever session held it before.
    ///
    /// The evicted session is closed with `LoggedInOnAnotherDevice` before the account
    /// lock is released, so no observer sees two sessions bound to one account.
    pub fn bind(
        &self,
        account_id: u32,
        session: &Arc<Session>,
    ) -> Result<BindOutcome, AnchorageError> {
        if let Some(previous) = session.account()
            && previous != account_id
        {
            self.unbind_account(previous, session.id());
        }

        let _account_guard = self.lock_account(account_id);
        let gate = self.gate.read();
        if let Some(reason) = gate.refusal() {
            drop(gate);
            session.close(Some(reason));
            self.sessions.remove(&session.id());
            return Err(AnchorageError::NotAdmitting);
        }
        if session.is_closed() {
            return Err(AnchorageError::SessionClosed);
        }

        self.sessions.insert(session.id(), session.clone());
        let previous_owner = self.accounts.insert(account_id, session.id());
        session.set_account(Some(account_id));
        drop(gate);

        let evicted = match previous_owner {
            Some(old_id) if old_id != session.id() => {
                self.sessions.remove(&old_id).map(|(_, old)| {
                    old.close(Some(DisconnectReason::LoggedInOnAnotherDevice));
                    old.set_account(None);
                    metrics::SESSIONS_KICKED_TOTAL.inc();
                    info!(
                        account = account_id,
                        evicted = old_id,
                        session = session.id(),
                        "kicked previous session for account"
                    );
                    old
                })
            }
            Some(_) => None,
            None => {
                metrics::BOUND_ACCOUNTS.inc();
                None
            }
        };
        Ok(BindOutcome { evicted })
    }

    fn unbind_account(&self, account_id: u32, session_id: u64) {
        let _account_guard = self.lock_account(account_id);
        if self
            .accounts
            .remove_if(&account_id, |_, owner| *owner == session_id)
            .is_some()
        {
            metrics::BOUND_ACCOUNTS.dec();
        }
    }

    /// Drops both index entries for `session`. The account entry is only removed if
    /// it still points at this session, so a late cleanup never unbinds a successor.
    pub fn remove(&self, session: &Session) {
        if let Some(account_id) = session.account() {
            self.unbind_account(account_id, session.id());
        }
        if self.sessions.remove(&session.id()).is_some() {
            debug!(session = session.id(), "session removed from registry");
        }
    }

    pub fn lookup(&self, session_id: u64) -> Option<Arc<Session>> {
        self.sessions.get(&session_id).map(|entry| entry.value().clone())
    }

    pub fn lookup_by_account(&self, account_id: u32) -> Option<Arc<Session>> {
        let session_id = *self.accounts.get(&account_id)?;
        self.lookup(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn bound_account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn list_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Closes the session bound to `account_id`, if there is one.
    pub fn kick_account(&self, account_id: u32, reason: DisconnectReason) -> bool {
        let session = {
            let _account_guard = self.lock_account(account_id);
            let Some((_, session_id)) = self.accounts.remove(&account_id) else {
                return false;
            };
            metrics::BOUND_ACCOUNTS.dec();
            let session = self.sessions.remove(&session_id).map(|(_, s)| s);
            if let Some(session) = &session {
                session.close(Some(reason));
                session.set_account(None);
            }
            session
        };
        if session.is_some() {
            metrics::SESSIONS_KICKED_TOTAL.inc();
            info!(account = account_id, %reason, "kicked account");
        }
        session.is_some()
    }

    /// Closes every live session with `reason` and empties both indexes.
    /// Returns how many sessions this call closed.
    pub fn disconnect_all(&self, reason: DisconnectReason) -> usize {
        let mut closed = 0;
        for session in self.list_sessions() {
            if session.close(Some(reason)) {
                closed += 1;
            }
            self.remove(&session);
        }
        if closed > 0 {
            info!(count = closed, %reason, "disconnected sessions");
        }
        closed
    }

    /// Turns maintenance mode on or off. Turning it on sweeps every session.
    pub fn set_maintenance(&self, enabled: bool) -> usize {
        self.gate.write().maintenance = enabled;
        metrics::MAINTENANCE_MODE.set(if enabled { 1.0 } else { 0.0 });
        if enabled {
            warn!("maintenance mode enabled, disconnecting all sessions");
            self.disconnect_all(DisconnectReason::ServerMaintenance)
        } else {
            info!("maintenance mode disabled");
            0
        }
    }

    /// Stops or resumes admitting sessions. Stopping disconnects everyone.
    pub fn set_accepting_connections(&self, accepting: bool) -> usize {
        self.gate.write().accepting = accepting;
        if accepting {
            info!("accepting connections again");
            0
        } else {
            warn!("no longer accepting connections, disconnecting all sessions");
            self.disconnect_all(DisconnectReason::ConnectionToServerLost)
        }
    }
}
