#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Boundary conditions: empty payloads, id wrap-around, teardown at awkward moments

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{MockOptions, MockServer};
use squad_rcon::parsers::parse_list_players;
use squad_rcon::utils::IdGenerator;
use squad_rcon::{ConnectionState, Packet, PacketType, RconClient, RconError};

// ============================================================================
// PACKETS
// ============================================================================

#[test]
fn test_empty_body_roundtrip() {
    let bytes = Packet::probe(9).to_bytes();
    assert_eq!(bytes.len(), 14);
    let (packet, used) = Packet::decode(&bytes, 4096).unwrap().unwrap();
    assert_eq!(used, 14);
    assert_eq!(packet.kind, PacketType::RESPONSE_VALUE);
    assert!(packet.body.is_empty());
}

#[test]
fn test_body_stops_at_first_nul() {
    // Squad's trailing packet after a probe echo carries bytes past an early NUL
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&14i32.to_le_bytes());
    bytes.extend_from_slice(&4i32.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 1, 0, 0]);
    let (packet, used) = Packet::decode(&bytes, 4096).unwrap().unwrap();
    assert_eq!(used, 18);
    assert!(packet.body.is_empty());
}

#[test]
fn test_unknown_packet_type_is_preserved() {
    let packet = Packet::new(1, PacketType::from_wire(7), "x");
    let (decoded, _) = Packet::decode(&packet.to_bytes(), 4096).unwrap().unwrap();
    assert_eq!(decoded.kind.wire(), 7);
    assert_eq!(format!("{:?}", decoded.kind), "PacketType(7)");
}

#[test]
fn test_id_generator_wraps_to_one() {
    let ids = IdGenerator::starting_at(i32::MAX);
    assert_eq!(ids.next_id(), i32::MAX);
    assert_eq!(ids.next_id(), 1);
    assert_eq!(IdGenerator::starting_at(-5).next_id(), 1);
}

// ============================================================================
// PARSERS
// ============================================================================

#[test]
fn test_empty_listing() {
    let listing = parse_list_players("----- Active Players -----\n\n----- Recently Disconnected Players [Max of 15] -----\n");
    assert!(listing.is_empty());
    assert!(listing.is_clean());
    assert!(listing.into_strict().unwrap().is_empty());
}

#[test]
fn test_strict_listing_reports_first_bad_line() {
    let listing = parse_list_players("nonsense\nmore nonsense");
    match listing.into_strict() {
        Err(RconError::Parse(err)) => {
            assert_eq!(err.line_number, 1);
            assert_eq!(err.line, "nonsense");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

// ============================================================================
// CLIENT LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_disconnect_when_never_connected_is_quiet() {
    let server = MockServer::start().await;
    let client = RconClient::new(server.config()).unwrap();
    let events = Arc::new(AtomicUsize::new(0));
    let counter = events.clone();
    client.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    client.disconnect().await;
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(events.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disconnect_cancels_pending_connect() {
    let server = MockServer::start_with(MockOptions {
        auth_delay: Duration::from_millis(200),
        ..MockOptions::default()
    })
    .await;
    let client = RconClient::new(server.config()).unwrap();

    let connecting = {
        let client = client.clone();
        tokio::spawn(async move { client.connect().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.disconnect().await;

    let result = connecting.await.unwrap();
    assert!(matches!(result, Err(RconError::ConnectionClosed)), "{result:?}");
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_empty_command_and_unicode() {
    let server = MockServer::start().await;
    let client = RconClient::new(server.config()).unwrap();

    assert_eq!(client.execute("").await.unwrap(), "");
    assert_eq!(
        client.broadcast("Привет, сервер ✓").await.unwrap(),
        "AdminBroadcast Привет, сервер ✓"
    );
}

#[tokio::test]
async fn test_command_body_with_nul_fails_without_killing_link() {
    let server = MockServer::start().await;
    let client = RconClient::new(server.config()).unwrap();
    client.connect().await.unwrap();

    let result = client.execute("bad\0command").await;
    assert!(matches!(result, Err(RconError::Protocol(_))), "{result:?}");

    // Refused before anything was written, so the link survives
    assert_eq!(client.execute("Ping").await.unwrap(), "Ping");
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_unreachable_server_times_out_or_refuses() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = squad_rcon::RconConfig::new("127.0.0.1", port, "secret");
    config.connect_timeout = Duration::from_millis(300);
    config.auto_reconnect = false;
    let client = RconClient::new(config).unwrap();

    let err = client.connect().await.unwrap_err();
    assert!(err.is_retryable(), "{err:?}");
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
