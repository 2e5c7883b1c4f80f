// src/connection/session.rs

//! Defines `Session`, the per-connection state shared between the connection task,
//! the dispatcher, command handlers, and the session registry.

use crate::core::AnchorageError;
use crate::core::protocol::frame::{self, Decoded};
use crate::core::protocol::messages::{Sc10999, ids};
use crate::core::protocol::{DisconnectReason, Frame};
use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use prost::Message;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::watch;
use tracing::info;

/// Frames queued by handlers and not yet written to the socket.
///
/// The closed flag lives under the same lock as the buffer so that a `send`
/// racing a `close` either lands before the farewell or not at all.
#[derive(Debug, Default)]
struct Outbound {
    buf: BytesMut,
    closed: bool,
}

/// Per-session counters, logged once when the session closes.
#[derive(Debug, Default)]
pub struct SessionStats {
    packets: AtomicU64,
    handler_errors: AtomicU64,
    write_errors: AtomicU64,
}

/// A point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStatsSnapshot {
    pub packets: u64,
    pub handler_errors: u64,
    pub write_errors: u64,
}

impl SessionStats {
    pub fn record_packet(&self) {
        self.packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// One live client connection and its identity binding.
#[derive(Debug)]
pub struct Session {
    id: u64,
    addr: SocketAddr,
    connected_at: Instant,
    /// Index of the request currently being served. Responses echo it.
    packet_index: AtomicU16,
    account: RwLock<Option<u32>>,
    outbound: Mutex<Outbound>,
    closed: AtomicBool,
    close_reason: Mutex<Option<DisconnectReason>>,
    close_tx: watch::Sender<bool>,
    stats: SessionStats,
}

impl Session {
    pub fn new(id: u64, addr: SocketAddr) -> Self {
        let (close_tx, _) = watch::channel(false);
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            packet_index: AtomicU16::new(0),
            account: RwLock::new(None),
            outbound: Mutex::new(Outbound::default()),
            closed: AtomicBool::new(false),
            close_reason: Mutex::new(None),
            close_tx,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn packet_index(&self) -> u16 {
        self.packet_index.load(Ordering::Acquire)
    }

    pub fn set_packet_index(&self, index: u16) {
        self.packet_index.store(index, Ordering::Release);
    }

    /// The account this session is logged in as, if any.
    pub fn account(&self) -> Option<u32> {
        *self.account.read()
    }

    pub fn is_authenticated(&self) -> bool {
        self.account().is_some()
    }

    /// Only the registry binds identities; see [`SessionRegistry::bind`](crate::core::state::SessionRegistry::bind).
    pub(crate) fn set_account(&self, account: Option<u32>) {
        *self.account.write() = account;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close_reason(&self) -> Option<DisconnectReason> {
        *self.close_reason.lock()
    }

    /// A receiver that flips to `true` once the session is closed.
    pub fn closed_signal(&self) -> watch::Receiver<bool> {
        self.close_tx.subscribe()
    }

    /// Appends one frame carrying `payload` to the outbound buffer and returns the
    /// number of bytes queued. A closed session silently drops the frame.
    pub fn send(&self, packet_id: u16, payload: &[u8]) -> Result<usize, AnchorageError> {
        let index = self.packet_index();
        let mut outbound = self.outbound.lock();
        if outbound.closed {
            return Ok(0);
        }
        frame::encode_into(packet_id, index, payload, &mut outbound.buf)
    }

    /// Encodes `message` and queues it. If encoding fails nothing is queued.
    pub fn send_message<M: Message>(
        &self,
        packet_id: u16,
        message: &M,
    ) -> Result<usize, AnchorageError> {
        let payload = message.encode_to_vec();
        self.send(packet_id, &payload)
    }

    /// Marks the bytes queued so far. Pair with [`rollback_outbound`](Self::rollback_outbound).
    pub fn outbound_checkpoint(&self) -> usize {
        self.outbound.lock().buf.len()
    }

    /// Discards frames queued after `checkpoint`. A closed session keeps its
    /// buffer, which by then only holds the disconnect notification.
    pub fn rollback_outbound(&self, checkpoint: usize) {
        let mut outbound = self.outbound.lock();
        if !outbound.closed && outbound.buf.len() > checkpoint {
            outbound.buf.truncate(checkpoint);
        }
    }

    /// Takes everything queued so far, leaving the buffer empty.
    pub fn take_outbound(&self) -> Bytes {
        self.outbound.lock().buf.split().freeze()
    }

    pub fn has_pending_output(&self) -> bool {
        !self.outbound.lock().buf.is_empty()
    }

    /// Decodes the queued frames without taking them.
    pub fn pending_frames(&self) -> Vec<Frame> {
        let outbound = self.outbound.lock();
        let mut frames = Vec::new();
        let mut rest = &outbound.buf[..];
        while let Ok(Decoded::Frame(frame, used)) = frame::decode(rest) {
            frames.push(frame);
            rest = &rest[used..];
        }
        frames
    }

    /// Closes the session. Anything not yet flushed is discarded; if a reason is
    /// given, a single disconnect notification is queued in its place.
    ///
    /// Returns `false` if the session was already closed, in which case nothing changes.
    pub fn close(&self, reason: Option<DisconnectReason>) -> bool {
        {
            let mut outbound = self.outbound.lock();
            if outbound.closed {
                return false;
            }
            outbound.buf.clear();
            if let Some(reason) = reason {
                let notice = Sc10999 {
                    reason: reason.code(),
                }
                .encode_to_vec();
                // The notice is a few bytes long, so this cannot exceed the frame limit.
                let _ = frame::encode_into(
                    ids::SC_DISCONNECT,
                    self.packet_index(),
                    &notice,
                    &mut outbound.buf,
                );
            }
            outbound.closed = true;
            *self.close_reason.lock() = reason;
            self.closed.store(true, Ordering::Release);
        }
        self.close_tx.send_replace(true);

        let stats = self.stats.snapshot();
        info!(
            session = self.id,
            addr = %self.addr,
            account = ?self.account(),
            reason = ?reason,
            packets = stats.packets,
            handler_errors = stats.handler_errors,
            write_errors = stats.write_errors,
            "session closed"
        );
        true
    }
}
