//! Connector integration tests
//!
//! Drive a real `Connector` against a mock kdb+ endpoint on localhost:
//! - Handshake, authentication and connection failures
//! - Sync round trips, including tables and server errors
//! - Async pushes picked up by `receive`
//! - Compressed replies
//! - State transitions on disconnect and reconnect
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test connector
//! ```

mod mock_server;

use std::net::TcpListener;
use std::time::{Duration, Instant};

use mock_server::MockServer;
use qlink::{
    Block, ClientError, ConnectOptions, ConnectionState, Connector, Float, Long, StructType,
    Symbol,
};

// =============================================================================
// Test Utilities
// =============================================================================

/// Replies for the handful of q expressions the tests send.
fn eval(command: &str) -> Option<Block> {
    let block = match command {
        "1+1" => Block::atom::<Long>(2),
        "1+1`" => Block::error("type"),
        "a:1" => Block::generic_null(),
        "1000#42" => Block::vector::<Long>(vec![42; 1000]),
        "([]col1:1 2 3 4;col2:1.1 2.2 3.3 4.4;col3:`first`second`third`fourth)" => {
            Block::table(
                vec!["col1".into(), "col2".into(), "col3".into()],
                vec![
                    Block::vector::<Long>(vec![1, 2, 3, 4]).into_ref(),
                    Block::vector::<Float>(vec![1.1, 2.2, 3.3, 4.4]).into_ref(),
                    Block::vector::<Symbol>(vec![
                        "first".into(),
                        "second".into(),
                        "third".into(),
                        "fourth".into(),
                    ])
                    .into_ref(),
                ],
            )
            .unwrap()
        }
        // Server goes away without answering.
        "exit 0" => return None,
        _ => Block::error(command.to_string()),
    };
    Some(block)
}

fn push(command: &str) -> Option<Block> {
    match command {
        "neg[.z.w] 999" => Some(Block::atom::<Long>(999)),
        _ => None,
    }
}

/// Route connector logs to the test output.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("qlink=debug")
        .with_test_writer()
        .try_init();
}

fn server() -> MockServer {
    init_logging();
    MockServer::builder().on_sync(eval).on_async(push).start()
}

fn connected(server: &MockServer) -> Connector {
    let mut conn = Connector::new();
    conn.connect(ConnectOptions::new("127.0.0.1", server.port()))
        .unwrap();
    conn
}

/// A port nothing listens on.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// =============================================================================
// Connecting
// =============================================================================

#[test]
fn test_connect_and_handshake() {
    let server = server();
    let conn = connected(&server);
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert_eq!(conn.capability(), Some(3));
    assert_eq!(conn.options().unwrap().port, server.port());
}

#[test]
fn test_credentials_accepted() {
    let server = MockServer::builder()
        .credentials("user:pwd")
        .on_sync(eval)
        .start();
    let mut conn = Connector::new();
    conn.connect(ConnectOptions::new("127.0.0.1", server.port()).with_credentials("user", "pwd"))
        .unwrap();
    assert_eq!(conn.sync("1+1").get::<Long>(), Ok(2));
}

#[test]
fn test_wrong_credentials_fail_authentication() {
    let server = MockServer::builder()
        .credentials("user:pwd")
        .on_sync(eval)
        .start();
    let mut conn = Connector::new();
    let err = conn
        .connect(ConnectOptions::new("127.0.0.1", server.port()).with_credentials("user", "nope"))
        .unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationFailed { .. }), "{err}");
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[test]
fn test_refused_connection_fails() {
    let mut conn = Connector::new();
    let err = conn
        .connect(ConnectOptions::new("127.0.0.1", closed_port()))
        .unwrap_err();
    assert!(matches!(err, ClientError::ConnectionFailed { .. }), "{err}");
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[test]
fn test_blocking_connect_without_timeout() {
    let server = server();
    let mut conn = Connector::new();
    conn.connect(ConnectOptions::new("127.0.0.1", server.port()).with_timeout(Duration::ZERO))
        .unwrap();
    assert!(conn.is_connected());
}

#[test]
fn test_reconnect_failure_leaves_disconnected() {
    let server = server();
    let mut conn = connected(&server);
    assert!(conn
        .connect(ConnectOptions::new("127.0.0.1", closed_port()))
        .is_err());
    assert_eq!(conn.state(), ConnectionState::Disconnected);

    // And a later connect works again.
    conn.connect(ConnectOptions::new("127.0.0.1", server.port()))
        .unwrap();
    assert_eq!(conn.sync("1+1").get::<Long>(), Ok(2));
}

#[test]
fn test_disconnect_is_idempotent() {
    let server = server();
    let mut conn = connected(&server);
    assert!(conn.disconnect());
    assert!(!conn.disconnect());
    assert!(!conn.disconnect());
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(matches!(conn.try_sync("1+1"), Err(ClientError::NotConnected)));
}

// =============================================================================
// Sync requests
// =============================================================================

#[test]
fn test_table_round_trip() {
    let server = server();
    let mut conn = connected(&server);

    let value =
        conn.sync("([]col1:1 2 3 4;col2:1.1 2.2 3.3 4.4;col3:`first`second`third`fourth)");
    assert_eq!(value.struct_type(), StructType::Table);

    let table = value.as_table().unwrap();
    assert_eq!(table.column_count(), 3);
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.column_names(), vec!["col1", "col2", "col3"]);
    assert_eq!(table.column::<Long>(0).unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(table.column::<Float>(1).unwrap()[2], 3.3);
    assert_eq!(table.cell::<Symbol>(3, 2).unwrap(), "fourth");

    // Copies share the block and give their references back on drop.
    let before = value.ref_count();
    let copies: Vec<_> = (0..16).map(|_| value.clone()).collect();
    assert_eq!(value.ref_count(), before + 16);
    drop(copies);
    assert_eq!(value.ref_count(), before);
}

#[test]
fn test_server_error_keeps_connection() {
    let server = server();
    let mut conn = connected(&server);

    let value = conn.sync("1+1`");
    assert!(value.is_null());
    assert_eq!(value.struct_type(), StructType::Error);
    assert!(matches!(conn.last_error(), Some(ClientError::Server(m)) if m == "type"));
    assert_eq!(conn.state(), ConnectionState::Connected);

    // The next request succeeds and clears the error.
    assert_eq!(conn.sync("1+1").get::<Long>(), Ok(2));
    assert!(conn.last_error().is_none());
}

#[test]
fn test_generic_null_reply() {
    let server = server();
    let mut conn = connected(&server);
    let value = conn.try_sync("a:1").unwrap();
    assert!(value.block().unwrap().is_generic_null());
    assert_eq!(value.struct_type(), StructType::Unknown);
}

#[test]
fn test_compressed_reply() {
    let server = MockServer::builder().compress(true).on_sync(eval).start();
    let mut conn = connected(&server);
    let value = conn.try_sync("1000#42").unwrap();
    let v = value.as_vector::<Long>().unwrap();
    assert_eq!(v.len(), 1000);
    assert!(v.iter().all(|&x| x == 42));
}

#[test]
fn test_server_hangup_is_transport_error() {
    let server = server();
    let mut conn = connected(&server);
    let err = conn.try_sync("exit 0").unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "{err}");
}

// =============================================================================
// Async and receive
// =============================================================================

#[test]
fn test_async_push_is_received() {
    let server = server();
    let mut conn = connected(&server);

    conn.send_async("neg[.z.w] 999");
    assert!(conn.last_error().is_none());
    let value = conn.receive(Duration::from_secs(5));
    assert_eq!(value.get::<Long>(), Ok(999));
}

#[test]
fn test_receive_times_out() {
    let server = server();
    let mut conn = connected(&server);

    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    let err = conn.try_receive(timeout).unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, ClientError::Timeout(_)), "{err}");
    assert!(elapsed < timeout + Duration::from_millis(500), "{elapsed:?}");
    assert_eq!(conn.state(), ConnectionState::Connected);

    let value = conn.receive(Duration::ZERO);
    assert!(value.is_null());
    assert!(matches!(conn.last_error(), Some(ClientError::Timeout(_))));

    // Still usable afterwards.
    assert_eq!(conn.sync("1+1").get::<Long>(), Ok(2));
}

#[test]
fn test_async_without_reply() {
    let server = server();
    let mut conn = connected(&server);
    conn.try_send_async("a:1").unwrap();
    assert!(conn.try_receive(Duration::from_millis(50)).is_err());
    assert_eq!(conn.sync("1+1").get::<Long>(), Ok(2));
}
