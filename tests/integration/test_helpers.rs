// tests/integration/test_helpers.rs

//! Test helpers and utilities shared by the unit, integration and property tests.

#![allow(dead_code)]

use anchorage::config::Config;
use anchorage::connection::Session;
use anchorage::core::commands::default_dispatcher;
use anchorage::core::handler::DispatchOutcome;
use anchorage::core::persistence::ledger::{self, AwardLine, ShopOffer};
use anchorage::core::persistence::Store;
use anchorage::core::protocol::frame::{self, Decoded};
use anchorage::core::protocol::messages::{Cs10022, Sc10023, Sc10999, ids};
use anchorage::core::protocol::{DisconnectReason, Frame, FrameCodec};
use anchorage::core::state::ServerState;
use anchorage::server;
use futures::{SinkExt, StreamExt};
use prost::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Installs a test-friendly subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("warn"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

pub fn test_addr() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// A fresh, unregistered session with a process-unique id.
pub fn new_session() -> Arc<Session> {
    let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
    Arc::new(Session::new(id, test_addr()))
}

/// Splits whatever the session has queued into frames, emptying the queue.
pub fn take_frames(session: &Session) -> Vec<Frame> {
    let bytes = session.take_outbound();
    let mut frames = Vec::new();
    let mut rest = &bytes[..];
    while let Ok(Decoded::Frame(frame, used)) = frame::decode(rest) {
        frames.push(frame);
        rest = &rest[used..];
    }
    assert!(rest.is_empty(), "outbound buffer held a partial frame");
    frames
}

/// Decodes the reason carried by an SC_10999 frame.
pub fn disconnect_reason(frame: &Frame) -> Option<DisconnectReason> {
    assert_eq!(frame.packet_id, ids::SC_DISCONNECT);
    let notice = Sc10999::decode(frame.payload.clone()).unwrap();
    DisconnectReason::from_code(notice.reason)
}

/// In-process server state with an in-memory store and the built-in handlers.
pub struct TestContext {
    pub state: Arc<ServerState>,
}

impl TestContext {
    pub fn new() -> Self {
        let mut config = Config::for_tests();
        config.create_player.auto_create = true;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        let store = Store::open(&config.database.path).expect("Failed to open store");
        let dispatcher = default_dispatcher().expect("Failed to build dispatcher");
        Self {
            state: ServerState::with_parts(config, store, dispatcher),
        }
    }

    /// A session already registered with the registry, as if just accepted.
    pub fn session(&self) -> Arc<Session> {
        let session = new_session();
        self.state
            .registry
            .register(session.clone())
            .expect("Failed to register session");
        session
    }

    pub async fn dispatch<M: Message>(
        &self,
        session: &Arc<Session>,
        packet_id: u16,
        packet_index: u16,
        message: &M,
    ) -> DispatchOutcome {
        let frame = Frame::new(packet_id, packet_index, message.encode_to_vec());
        self.state.dispatcher.dispatch(&self.state, session, frame).await
    }

    /// Sends a response-producing request and decodes the single reply frame.
    pub async fn request<Req: Message, Resp: Message + Default>(
        &self,
        session: &Arc<Session>,
        packet_id: u16,
        response_id: u16,
        message: &Req,
    ) -> Resp {
        let outcome = self.dispatch(session, packet_id, 1, message).await;
        assert!(
            matches!(outcome, DispatchOutcome::Handled(_)),
            "unexpected outcome: {outcome:?}"
        );
        let frames = take_frames(session);
        assert_eq!(frames.len(), 1, "expected exactly one response frame");
        assert_eq!(frames[0].packet_id, response_id);
        Resp::decode(frames[0].payload.clone()).unwrap()
    }

    pub async fn login(&self, session: &Arc<Session>, account_id: u32) -> Sc10023 {
        let request = Cs10022 {
            account_id,
            ..Default::default()
        };
        self.request(session, ids::CS_JOIN_SERVER, ids::SC_JOIN_SERVER, &request)
            .await
    }

    /// A registered session logged in as `account_id`.
    pub async fn logged_in(&self, account_id: u32) -> Arc<Session> {
        let session = self.session();
        let response = self.login(&session, account_id).await;
        assert_eq!(response.user_id, account_id);
        session
    }

    pub async fn seed_offer(&self, offer: ShopOffer) {
        self.state
            .store
            .with_transaction(move |tx| ledger::upsert_offer(tx, &offer))
            .await
            .unwrap();
    }

    pub async fn seed_award_lines(&self, lines: Vec<AwardLine>) {
        self.state
            .store
            .with_transaction(move |tx| {
                lines
                    .iter()
                    .try_for_each(|line| ledger::insert_award_line(tx, line))
            })
            .await
            .unwrap();
    }

    pub async fn resource(&self, commander_id: u32, resource_id: u32) -> u32 {
        self.state
            .store
            .read(move |conn| ledger::resource_amount(conn, commander_id, resource_id))
            .await
            .unwrap()
    }

    pub async fn item(&self, commander_id: u32, item_id: u32) -> u32 {
        self.state
            .store
            .read(move |conn| ledger::item_count(conn, commander_id, item_id))
            .await
            .unwrap()
    }

    pub async fn stock(&self, offer_id: u32) -> Option<u32> {
        self.state
            .store
            .read(move |conn| ledger::offer_stock(conn, offer_id))
            .await
            .unwrap()
    }

    pub async fn last_award(&self, commander_id: u32, track_id: u32) -> u32 {
        self.state
            .store
            .read(move |conn| ledger::last_award_index(conn, commander_id, track_id))
            .await
            .unwrap()
    }
}

/// A real server listening on an ephemeral loopback port.
pub struct TestServer {
    pub state: Arc<ServerState>,
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let mut config = Config::for_tests();
        config.create_player.auto_create = true;
        Self::with_config(config).await
    }

    pub async fn with_config(config: Config) -> Self {
        init_tracing();
        let state = ServerState::initialize(config).expect("Failed to initialize server state");
        let ctx = server::setup_with_state(state.clone())
            .await
            .expect("Failed to bind listener");
        let addr = ctx.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(server::run_until(ctx, async move {
            let _ = shutdown_rx.await;
        }));
        Self {
            state,
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    pub async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        TestClient {
            framed: Framed::new(stream, FrameCodec::default()),
            next_index: 0,
        }
    }

    /// Connects and logs in, returning the client and the login response.
    pub async fn login(&self, account_id: u32) -> (TestClient, Sc10023) {
        let mut client = self.connect().await;
        client
            .send(
                ids::CS_JOIN_SERVER,
                &Cs10022 {
                    account_id,
                    ..Default::default()
                },
            )
            .await;
        let response: Sc10023 = client.recv_message(ids::SC_JOIN_SERVER).await;
        (client, response)
    }

    /// Polls until the registry holds `expected` sessions.
    pub async fn wait_for_session_count(&self, expected: usize) {
        let state = self.state.clone();
        tokio::time::timeout(RECV_TIMEOUT, async move {
            while state.session_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("session count never reached {expected}"));
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(10), self.handle).await;
    }
}

/// A client speaking the frame protocol over a real socket.
pub struct TestClient {
    framed: Framed<TcpStream, FrameCodec>,
    next_index: u16,
}

impl TestClient {
    /// Sends `message` and returns the packet index it was sent with.
    pub async fn send<M: Message>(&mut self, packet_id: u16, message: &M) -> u16 {
        self.next_index = self.next_index.wrapping_add(1);
        let frame = Frame::new(packet_id, self.next_index, message.encode_to_vec());
        self.framed.send(frame).await.unwrap();
        self.next_index
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await.unwrap();
        stream.flush().await.unwrap();
    }

    /// Half-closes the socket; the server sees EOF on its read side.
    pub async fn shutdown_write(&mut self) {
        self.framed.get_mut().shutdown().await.unwrap();
    }

    /// The next frame, or `None` if the server closed the connection.
    pub async fn recv(&mut self) -> Option<Frame> {
        match tokio::time::timeout(RECV_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(frame))) => Some(frame),
            Ok(_) => None,
            Err(_) => panic!("timed out waiting for a frame"),
        }
    }

    pub async fn recv_message<M: Message + Default>(&mut self, packet_id: u16) -> M {
        let frame = self.recv().await.expect("connection closed unexpectedly");
        assert_eq!(frame.packet_id, packet_id);
        M::decode(frame.payload).unwrap()
    }

    /// Expects an SC_10999 notice followed by the server closing the socket.
    pub async fn expect_disconnect(&mut self) -> DisconnectReason {
        let frame = self.recv().await.expect("expected a disconnect notice");
        let reason = disconnect_reason(&frame).expect("unknown disconnect reason");
        assert!(self.recv().await.is_none(), "connection stayed open");
        reason
    }
}
