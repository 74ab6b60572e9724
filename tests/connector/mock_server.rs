//! Minimal kdb+ endpoint for driving the connector over real sockets
//!
//! Speaks the handshake and message framing, hands each command string to
//! a closure, and writes the returned object back.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use qlink::wire::{self, compress, encode_message, parse_credentials, MessageType};
use qlink::{Block, Char, Value};

type SyncHandler = dyn Fn(&str) -> Option<Block> + Send + Sync;
type AsyncHandler = dyn Fn(&str) -> Option<Block> + Send + Sync;

/// Running mock server. Its thread lives until the test process exits.
pub struct MockServer {
    addr: SocketAddr,
}

impl MockServer {
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::default()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

#[derive(Default)]
pub struct MockServerBuilder {
    credentials: Option<String>,
    compress: bool,
    on_sync: Option<Arc<SyncHandler>>,
    on_async: Option<Arc<AsyncHandler>>,
}

impl MockServerBuilder {
    /// Reject any handshake not carrying exactly these credentials.
    pub fn credentials(mut self, credentials: &str) -> Self {
        self.credentials = Some(credentials.to_string());
        self
    }

    /// Compress replies whenever that halves their size.
    pub fn compress(mut self, on: bool) -> Self {
        self.compress = on;
        self
    }

    /// Reply to sync requests; `None` drops the connection without replying.
    pub fn on_sync(mut self, f: impl Fn(&str) -> Option<Block> + Send + Sync + 'static) -> Self {
        self.on_sync = Some(Arc::new(f));
        self
    }

    /// Optionally push a message back after an async request.
    pub fn on_async(mut self, f: impl Fn(&str) -> Option<Block> + Send + Sync + 'static) -> Self {
        self.on_async = Some(Arc::new(f));
        self
    }

    pub fn start(self) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(self);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let shared = Arc::clone(&shared);
                thread::spawn(move || shared.serve(stream));
            }
        });
        MockServer { addr }
    }

    fn serve(&self, stream: TcpStream) {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut writer = stream;

        let mut opening = Vec::new();
        if reader.read_until(0, &mut opening).unwrap_or(0) == 0 {
            return;
        }
        opening.pop();
        let Some((credentials, capability)) = parse_credentials(&opening) else {
            return;
        };
        if let Some(expected) = &self.credentials {
            if credentials != expected.as_str() {
                // Rejection is signalled by closing the socket.
                return;
            }
        }
        if writer.write_all(&[capability.min(wire::CAPABILITY)]).is_err() {
            return;
        }

        while let Ok(frame) = wire::read_message(&mut reader) {
            let Ok(block) = frame.decode() else { return };
            let command = match Value::adopt(block).as_vector::<Char>() {
                Ok(chars) => chars.to_string_lossy(),
                Err(_) => return,
            };

            let (reply, msg_type) = match frame.header.msg_type {
                MessageType::Sync => {
                    let handler = self.on_sync.as_ref();
                    match handler.and_then(|f| f(&command)) {
                        Some(block) => (block, MessageType::Response),
                        None => return,
                    }
                }
                _ => match self.on_async.as_ref().and_then(|f| f(&command)) {
                    Some(block) => (block, MessageType::Async),
                    None => continue,
                },
            };

            let mut message = encode_message(msg_type, &reply).unwrap();
            if self.compress {
                if let Some(compressed) = compress(&message) {
                    message = compressed;
                }
            }
            if writer.write_all(&message).is_err() {
                return;
            }
        }
    }
}
