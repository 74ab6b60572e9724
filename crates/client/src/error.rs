//! Connector errors

use std::io;
use std::time::Duration;

use qlink_wire::WireError;
use thiserror::Error;

/// Result alias for connector operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failure reported by the connector.
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connect (or the handshake write) failed.
    #[error("failed to connect to {addr}: {source}")]
    ConnectionFailed {
        /// `host:port` that was dialled
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The server closed the socket during the handshake.
    #[error("authentication failed for {addr}")]
    AuthenticationFailed {
        /// `host:port` that rejected the credentials
        addr: String,
    },

    /// The operation needs a live connection.
    #[error("connection not established")]
    NotConnected,

    /// Writing the request or reading the reply failed.
    #[error("failed to communicate with server: {0}")]
    Transport(#[source] WireError),

    /// The server answered with an error (`'type`, `'length`, ...).
    #[error("server error: {0}")]
    Server(String),

    /// No data arrived within the receive window.
    #[error("no data within {} ms", .0.as_millis())]
    Timeout(Duration),

    /// Waiting for readability failed; the connection was closed.
    #[error("connection error while waiting for data: {0}")]
    Poll(#[source] io::Error),

    /// The reply could not be decoded.
    #[error("failed to decode reply: {0}")]
    Decode(#[source] WireError),

    /// Invalid connection options.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Transport(WireError::Io(e))
    }
}
