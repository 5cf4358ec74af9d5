// DevTools transport layer
//
// Handles bidirectional communication with a DevTools target.
// - WebSocketTransport: the target's debugger WebSocket
//
// The receive half pushes inbound text frames into a channel consumed by the
// dispatch loop, and records how the socket closed in a shared SocketState so
// a timed-out command can tell a dead socket from a slow target.

use crate::Result;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;

pub mod websocket;

pub use websocket::{WebSocketTransport, WebSocketTransportReceiver, WebSocketTransportSender};

/// WebSocket close codes the session classifies
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const ABNORMAL: u16 = 1006;
    pub const INVALID_PAYLOAD: u16 = 1007;
    pub const MESSAGE_TOO_BIG: u16 = 1009;
}

/// Whether the socket is still open, and if not, its close code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStatus {
    Open,
    Closed { code: Option<u16> },
}

/// Socket status shared between the transport halves and the session
#[derive(Debug)]
pub struct SocketState {
    status: Mutex<SocketStatus>,
}

impl Default for SocketState {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketState {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(SocketStatus::Open),
        }
    }

    pub fn status(&self) -> SocketStatus {
        *self.status.lock()
    }

    pub fn is_open(&self) -> bool {
        self.status() == SocketStatus::Open
    }

    /// Records the close code. The first closure wins; later reports (e.g.
    /// the stream ending after a close frame) do not overwrite it.
    pub fn mark_closed(&self, code: Option<u16>) {
        let mut status = self.status.lock();
        if *status == SocketStatus::Open {
            *status = SocketStatus::Closed { code };
        }
    }
}

/// Trait for the sending half of a transport
pub trait TransportSender: Send + Unpin {
    /// Send one text frame
    fn send(&mut self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Close the socket with a normal closure
    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Trait for the receiving half of a transport
pub trait TransportReceiver: Send + Unpin {
    /// Run the receive loop until the socket closes or fails
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
