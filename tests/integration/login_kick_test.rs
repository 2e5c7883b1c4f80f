// tests/integration/login_kick_test.rs

//! Login over TCP, evict-and-replace on a second login, and connection teardown.

use super::test_helpers::{TestContext, TestServer};
use anchorage::config::Config;
use anchorage::core::ResultKind;
use anchorage::core::persistence::ledger;
use anchorage::core::protocol::DisconnectReason;
use anchorage::core::protocol::messages::{Cs10022, Cs10100, Sc10023, Sc10101, ids};

#[tokio::test]
async fn test_login_binds_account() {
    let server = TestServer::start().await;
    let (_client, response) = server.login(42).await;

    assert_eq!(response.result, ResultKind::Success.code());
    assert_eq!(response.user_id, 42);
    assert_eq!(response.server_ticket, server.state.config.server_ticket);
    assert!(server.state.find_session_by_account(42).is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_response_echoes_packet_index() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    let first = client
        .send(ids::CS_HEARTBEAT, &Cs10100 { need_request: 0 })
        .await;
    let second = client
        .send(ids::CS_HEARTBEAT, &Cs10100 { need_request: 0 })
        .await;

    for expected in [first, second] {
        let frame = client.recv().await.unwrap();
        assert_eq!(frame.packet_id, ids::SC_HEARTBEAT);
        assert_eq!(frame.packet_index, expected);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_second_login_kicks_first() {
    let server = TestServer::start().await;
    let (mut first, _) = server.login(7).await;
    let first_session = server.state.find_session_by_account(7).unwrap();

    let (mut second, response) = server.login(7).await;
    assert_eq!(response.user_id, 7);

    assert_eq!(
        first.expect_disconnect().await,
        DisconnectReason::LoggedInOnAnotherDevice
    );

    let owner = server.state.find_session_by_account(7).unwrap();
    assert_ne!(owner.id(), first_session.id());
    server.wait_for_session_count(1).await;

    // The surviving connection keeps working.
    second
        .send(ids::CS_HEARTBEAT, &Cs10100 { need_request: 0 })
        .await;
    let reply: Sc10101 = second.recv_message(ids::SC_HEARTBEAT).await;
    assert_eq!(reply.state, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_account_without_auto_create() {
    let server = TestServer::with_config(Config::for_tests()).await;
    let (_client, response) = server.login(500).await;
    assert_eq!(response.user_id, 0);
    assert!(server.state.find_session_by_account(500).is_none());
    server.stop().await;
}

#[tokio::test]
async fn test_account_zero_is_not_bound() {
    let server = TestServer::start().await;
    let (_client, response) = server.login(0).await;
    assert_eq!(response.user_id, 0);
    assert_eq!(server.state.registry.bound_account_count(), 0);
    server.stop().await;
}

fn device_login(account_id: u32, device: &str) -> Cs10022 {
    Cs10022 {
        account_id,
        device_id: Some(device.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_account_zero_recovered_from_device() {
    let ctx = TestContext::new();
    let first = ctx.session();
    let response: Sc10023 = ctx
        .request(&first, ids::CS_JOIN_SERVER, ids::SC_JOIN_SERVER, &device_login(21, "tablet-1"))
        .await;
    assert_eq!(response.user_id, 21);

    let second = ctx.session();
    let response: Sc10023 = ctx
        .request(&second, ids::CS_JOIN_SERVER, ids::SC_JOIN_SERVER, &device_login(0, "tablet-1"))
        .await;
    assert_eq!(response.result, ResultKind::Success.code());
    assert_eq!(response.user_id, 21);
    assert_eq!(second.account(), Some(21));
    assert!(first.is_closed());
}

#[tokio::test]
async fn test_account_zero_with_unknown_device_is_not_bound() {
    let ctx = TestContext::new();
    let session = ctx.session();
    let response: Sc10023 = ctx
        .request(&session, ids::CS_JOIN_SERVER, ids::SC_JOIN_SERVER, &device_login(0, "never-seen"))
        .await;
    assert_eq!(response.user_id, 0);
    assert!(!session.is_authenticated());
    assert_eq!(ctx.state.registry.bound_account_count(), 0);
}

#[tokio::test]
async fn test_banned_login_does_not_remember_device() {
    let ctx = TestContext::new();
    ctx.state
        .store
        .with_transaction(|tx| {
            ledger::create_commander(tx, 67, "banned", &Default::default())?;
            ledger::set_banned(tx, 67, true)
        })
        .await
        .unwrap();

    let session = ctx.session();
    let response: Sc10023 = ctx
        .request(&session, ids::CS_JOIN_SERVER, ids::SC_JOIN_SERVER, &device_login(67, "shared-pc"))
        .await;
    assert_eq!(response.result, ResultKind::Banned.code());

    let remembered = ctx
        .state
        .store
        .read(|conn| ledger::account_for_device(conn, "shared-pc"))
        .await
        .unwrap();
    assert_eq!(remembered, None);
}

#[tokio::test]
async fn test_banned_commander_is_refused() {
    let server = TestServer::start().await;
    server
        .state
        .store
        .with_transaction(|tx| {
            ledger::create_commander(tx, 66, "banned", &Default::default())?;
            ledger::set_banned(tx, 66, true)
        })
        .await
        .unwrap();

    let mut client = server.connect().await;
    client
        .send(
            ids::CS_JOIN_SERVER,
            &Cs10022 {
                account_id: 66,
                ..Default::default()
            },
        )
        .await;
    let response: Sc10023 = client.recv_message(ids::SC_JOIN_SERVER).await;
    assert_eq!(response.result, ResultKind::Banned.code());
    assert!(server.state.find_session_by_account(66).is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_frame_closes_connection() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    // A body length below the 5-byte minimum can never be valid.
    client.send_raw(&[0x00, 0x02]).await;
    assert_eq!(
        client.expect_disconnect().await,
        DisconnectReason::DataValidationFailed
    );
    server.wait_for_session_count(0).await;

    server.stop().await;
}

#[tokio::test]
async fn test_hangup_mid_frame_is_a_plain_disconnect() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;
    server.wait_for_session_count(1).await;
    let session = server.state.list_sessions().pop().unwrap();

    // A valid 10-byte length prefix, then EOF before the rest of the frame.
    client.send_raw(&[0x00, 0x0a, 0x00]).await;
    client.shutdown_write().await;

    assert!(client.recv().await.is_none(), "no disconnect notice expected");
    server.wait_for_session_count(0).await;
    assert!(session.is_closed());
    assert_eq!(session.close_reason(), None);

    server.stop().await;
}

#[tokio::test]
async fn test_peer_disconnect_cleans_up_registry() {
    let server = TestServer::start().await;
    let (client, _) = server.login(31).await;
    assert_eq!(server.state.session_count(), 1);

    drop(client);
    server.wait_for_session_count(0).await;
    assert!(server.state.find_session_by_account(31).is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_notifies_clients() {
    let server = TestServer::start().await;
    let (mut client, _) = server.login(88).await;

    let stopping = tokio::spawn(server.stop());
    assert_eq!(
        client.expect_disconnect().await,
        DisconnectReason::ConnectionToServerLost
    );
    stopping.await.unwrap();
}
