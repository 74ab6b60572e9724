//! Blocking connection to a kdb+ process
//!
//! A [`Connector`] owns at most one TCP connection and has one request in
//! flight at a time. It moves between two states:
//!
//! ```text
//! Disconnected --connect ok--> Connected
//! Connected --disconnect / drop / receive wait error--> Disconnected
//! Connected --connect--> (disconnect, then dial again)
//! ```
//!
//! Request methods come in pairs. The `try_*` form returns a [`Result`];
//! the plain form logs the failure, keeps it in [`Connector::last_error`],
//! and returns an empty [`Value`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use qlink_core::{StructType, Value};
use qlink_wire::{encode_command, encode_credentials, read_message, MessageType, CAPABILITY};

use crate::error::{ClientError, Result};
use crate::options::ConnectOptions;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No live connection.
    Disconnected,
    /// Handshake completed.
    Connected,
}

/// Client for one kdb+ process.
///
/// # Example
///
/// ```no_run
/// use qlink_client::{ConnectOptions, Connector};
/// use qlink_core::Long;
///
/// let mut conn = Connector::new();
/// conn.connect(ConnectOptions::new("localhost", 5000)).unwrap();
/// let two = conn.sync("1+1");
/// assert_eq!(two.get::<Long>(), Ok(2));
/// ```
#[derive(Debug, Default)]
pub struct Connector {
    stream: Option<TcpStream>,
    options: Option<ConnectOptions>,
    capability: Option<u8>,
    last_error: Option<ClientError>,
}

impl Connector {
    /// Disconnected connector.
    pub fn new() -> Self {
        Connector::default()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        if self.stream.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// True when connected.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Options of the most recent `connect`.
    pub fn options(&self) -> Option<&ConnectOptions> {
        self.options.as_ref()
    }

    /// Capability byte the server answered the handshake with.
    pub fn capability(&self) -> Option<u8> {
        self.capability
    }

    /// Failure of the most recent request, if it failed.
    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    /// Connect and authenticate, replacing any existing connection.
    ///
    /// On failure the connector is left disconnected.
    pub fn connect(&mut self, options: ConnectOptions) -> Result<()> {
        if self.is_connected() {
            self.disconnect();
        }
        options.validate()?;
        let addr = options.address();
        tracing::info!(
            target: "qlink::client",
            %addr,
            timeout_ms = options.timeout_ms,
            "connecting"
        );
        self.options = Some(options.clone());

        match handshake(&options) {
            Ok((stream, capability)) => {
                tracing::info!(target: "qlink::client", %addr, capability, "connected");
                self.stream = Some(stream);
                self.capability = Some(capability);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(target: "qlink::client", %addr, error = %e, "connect failed");
                Err(e)
            }
        }
    }

    /// Close the connection.
    ///
    /// Returns false, and does nothing else, when already disconnected.
    pub fn disconnect(&mut self) -> bool {
        let Some(stream) = self.stream.take() else {
            tracing::debug!(target: "qlink::client", "connection already closed");
            return false;
        };
        if let Err(e) = stream.shutdown(Shutdown::Both) {
            tracing::debug!(target: "qlink::client", error = %e, "shutdown failed");
        }
        self.capability = None;
        tracing::info!(
            target: "qlink::client",
            addr = %self.options.as_ref().map(ConnectOptions::address).unwrap_or_default(),
            "closed connection"
        );
        true
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(ClientError::NotConnected)
    }

    fn report(&mut self, op: &'static str, e: ClientError) -> Value {
        match &e {
            ClientError::Timeout(_) => {
                tracing::debug!(target: "qlink::client", op, error = %e, "request failed")
            }
            _ => tracing::warn!(target: "qlink::client", op, error = %e, "request failed"),
        }
        self.last_error = Some(e);
        Value::null()
    }

    fn finish(&mut self, op: &'static str, result: Result<Value>) -> Value {
        match result {
            Ok(v) => {
                self.last_error = None;
                v
            }
            Err(e) => self.report(op, e),
        }
    }

    /// Evaluate `command` on the server and wait for the reply.
    ///
    /// Server errors come back as [`ClientError::Server`]; the connection
    /// stays up.
    pub fn try_sync(&mut self, command: &str) -> Result<Value> {
        let stream = self.stream()?;
        tracing::debug!(target: "qlink::client", command, "sync");
        let message = encode_command(MessageType::Sync, command).map_err(ClientError::Transport)?;
        stream.write_all(&message)?;
        stream.flush()?;
        read_reply(stream)
    }

    /// [`try_sync`](Self::try_sync), returning an empty value on failure.
    pub fn sync(&mut self, command: &str) -> Value {
        let result = self.try_sync(command);
        self.finish("sync", result)
    }

    /// Send `command` without waiting for a reply.
    pub fn try_send_async(&mut self, command: &str) -> Result<()> {
        let stream = self.stream()?;
        tracing::debug!(target: "qlink::client", command, "async");
        let message =
            encode_command(MessageType::Async, command).map_err(ClientError::Transport)?;
        stream.write_all(&message)?;
        stream.flush()?;
        Ok(())
    }

    /// [`try_send_async`](Self::try_send_async), logging any failure.
    pub fn send_async(&mut self, command: &str) {
        match self.try_send_async(command) {
            Ok(()) => self.last_error = None,
            Err(e) => {
                self.report("async", e);
            }
        }
    }

    /// Wait up to `timeout` for a message pushed by the server and read it.
    ///
    /// A zero timeout polls. If waiting itself fails the connection is
    /// closed and [`ClientError::Poll`] returned.
    pub fn try_receive(&mut self, timeout: Duration) -> Result<Value> {
        let ready = wait_readable(self.stream()?, timeout);
        match ready {
            Ok(true) => {}
            Ok(false) => return Err(ClientError::Timeout(timeout)),
            Err(e) => {
                self.disconnect();
                return Err(ClientError::Poll(e));
            }
        }
        read_reply(self.stream()?)
    }

    /// [`try_receive`](Self::try_receive), returning an empty value on
    /// failure or timeout.
    pub fn receive(&mut self, timeout: Duration) -> Value {
        let result = self.try_receive(timeout);
        self.finish("receive", result)
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        if self.is_connected() {
            self.disconnect();
        }
    }
}

fn dial(options: &ConnectOptions) -> io::Result<TcpStream> {
    let Some(timeout) = options.timeout() else {
        return TcpStream::connect((options.host.as_str(), options.port));
    };
    let mut last = None;
    for addr in (options.host.as_str(), options.port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}

/// Dial, send credentials and read the capability byte.
fn handshake(options: &ConnectOptions) -> Result<(TcpStream, u8)> {
    let addr = options.address();
    let failed = |source| ClientError::ConnectionFailed {
        addr: addr.clone(),
        source,
    };

    let mut stream = dial(options).map_err(failed)?;
    stream.set_nodelay(true).map_err(failed)?;
    stream.set_read_timeout(options.timeout()).map_err(failed)?;
    stream.set_write_timeout(options.timeout()).map_err(failed)?;

    stream
        .write_all(&encode_credentials(options.credentials(), CAPABILITY))
        .map_err(failed)?;

    let mut reply = [0u8; 1];
    let capability = match stream.read(&mut reply) {
        Ok(0) => return Err(ClientError::AuthenticationFailed { addr: addr.clone() }),
        Ok(_) => reply[0],
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
            ) =>
        {
            return Err(ClientError::AuthenticationFailed { addr: addr.clone() })
        }
        Err(e) => return Err(failed(e)),
    };

    stream.set_read_timeout(None).map_err(failed)?;
    stream.set_write_timeout(None).map_err(failed)?;
    Ok((stream, capability))
}

/// Block until one message arrives and decode it.
fn read_reply(stream: &mut TcpStream) -> Result<Value> {
    let frame = read_message(stream).map_err(ClientError::Transport)?;
    let block = frame.decode().map_err(ClientError::Decode)?;
    if block.struct_type() == StructType::Error {
        let message = block.message().unwrap_or_default().to_string();
        return Err(ClientError::Server(message));
    }
    Ok(Value::adopt(block))
}

/// Whether data (or end of stream) is available within `timeout`.
fn wait_readable(stream: &TcpStream, timeout: Duration) -> io::Result<bool> {
    let mut probe = [0u8; 1];
    let peeked = if timeout.is_zero() {
        // A zero read timeout is rejected, so poll in non-blocking mode.
        stream.set_nonblocking(true)?;
        let r = stream.peek(&mut probe);
        stream.set_nonblocking(false)?;
        r
    } else {
        stream.set_read_timeout(Some(timeout))?;
        let r = stream.peek(&mut probe);
        stream.set_read_timeout(None)?;
        r
    };
    match peeked {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disconnected() {
        let conn = Connector::new();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.options().is_none());
        assert!(conn.capability().is_none());
    }

    #[test]
    fn test_requests_need_a_connection() {
        let mut conn = Connector::new();
        assert!(matches!(conn.try_sync("1+1"), Err(ClientError::NotConnected)));
        assert!(matches!(conn.try_send_async("a:1"), Err(ClientError::NotConnected)));
        assert!(matches!(
            conn.try_receive(Duration::from_millis(1)),
            Err(ClientError::NotConnected)
        ));

        let v = conn.sync("1+1");
        assert!(v.is_null());
        assert_eq!(v.struct_type(), StructType::Error);
        assert!(matches!(conn.last_error(), Some(ClientError::NotConnected)));

        conn.send_async("a:1");
        assert!(conn.receive(Duration::ZERO).is_null());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_when_disconnected() {
        let mut conn = Connector::new();
        assert!(!conn.disconnect());
        assert!(!conn.disconnect());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    /// Client socket whose peer closed with unread data, so the client sees
    /// a reset rather than end of stream.
    fn reset_stream() -> TcpStream {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        client.write_all(b"unread").unwrap();
        let mut probe = [0u8; 1];
        server.peek(&mut probe).unwrap();
        drop(server);
        // Give the reset time to arrive.
        std::thread::sleep(Duration::from_millis(50));
        client
    }

    #[test]
    fn test_wait_readable_reports_reset() {
        let client = reset_stream();
        let err = wait_readable(&client, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_receive_wait_failure_disconnects() {
        let mut conn = Connector::new();
        conn.stream = Some(reset_stream());
        assert!(conn.is_connected());
        let err = conn.try_receive(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ClientError::Poll(_)), "{err}");
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_invalid_options_rejected_before_dialling() {
        let mut conn = Connector::new();
        let err = conn.connect(ConnectOptions::new("", 5000)).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }
}
