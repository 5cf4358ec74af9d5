//! Dispatch loop
//!
//! Owns the receive side of a session's socket. Every inbound frame is
//! decoded, classified and stored, and at most one waiter is woken per frame,
//! strictly in arrival order. Nothing received here is ever surfaced to a
//! caller as an error: empty and malformed frames are logged and skipped.

use crate::protocol::EventCatalogue;
use crate::server::codec::{self, Frame};
use crate::server::correlation::{CorrelationTables, Resolution};
use crate::server::identity;
use crate::server::transport::{TransportReceiver, TransportSender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::{mpsc, oneshot};

/// How long to wait for the peer to finish the closing handshake
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Loop state shared with the session
#[derive(Debug)]
pub struct DispatchState {
    running: AtomicBool,
}

impl DispatchState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
        }
    }

    pub fn get(&self) -> LoopState {
        if self.running.load(Ordering::SeqCst) {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the loop did with one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Empty or whitespace-only frame
    Empty,
    Malformed,
    Ack(Resolution),
    Event(Resolution),
    /// Notification that cannot be keyed; logged only
    Unkeyed,
}

pub struct DispatchLoop {
    session: Arc<str>,
    tables: Arc<CorrelationTables>,
    catalogue: Arc<EventCatalogue>,
    state: Arc<DispatchState>,
}

impl DispatchLoop {
    pub fn new(
        session: Arc<str>,
        tables: Arc<CorrelationTables>,
        catalogue: Arc<EventCatalogue>,
        state: Arc<DispatchState>,
    ) -> Self {
        Self {
            session,
            tables,
            catalogue,
            state,
        }
    }

    /// Runs until `shutdown` fires or the socket stops delivering frames.
    ///
    /// On shutdown the socket is closed through `sender`. On either exit the
    /// state becomes [`LoopState::Stopped`] and every outstanding waiter is
    /// released so in-flight commands fail fast.
    pub async fn run(
        self,
        mut transport_receiver: Box<dyn TransportReceiver>,
        mut message_rx: mpsc::UnboundedReceiver<String>,
        sender: Arc<TokioMutex<Box<dyn TransportSender>>>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let session = Arc::clone(&self.session);
        let mut transport_handle = tokio::spawn(async move {
            if let Err(e) = transport_receiver.run().await {
                tracing::error!(session = %session, "Transport error: {}", e);
            }
        });

        let cancelled = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break true,
                message = message_rx.recv() => match message {
                    Some(text) => {
                        self.handle_frame(&text);
                    }
                    None => break false,
                },
            }
        };

        if cancelled {
            tracing::debug!(session = %self.session, "Dispatch loop cancelled, closing socket");
            if let Err(e) = sender.lock().await.close().await {
                tracing::warn!(session = %self.session, "Error closing socket: {}", e);
            }
            if tokio::time::timeout(CLOSE_GRACE, &mut transport_handle)
                .await
                .is_err()
            {
                transport_handle.abort();
            }
        } else {
            tracing::warn!(session = %self.session, "Message loop ended (socket closed)");
            let _ = transport_handle.await;
        }

        self.state.stop();
        let released = self.tables.release_all();
        if released > 0 {
            tracing::debug!(session = %self.session, released, "Released pending waiters");
        }
    }

    /// Handles one inbound text frame
    pub fn handle_frame(&self, text: &str) -> Dispatched {
        if text.trim().is_empty() {
            tracing::error!(
                session = %self.session,
                "Missing message, may have been a connection timeout"
            );
            return Dispatched::Empty;
        }

        match codec::decode(text) {
            Frame::Ack(ack) => {
                let id = ack.id;
                let resolution = self.tables.resolve_ack(id, ack);
                match resolution {
                    Resolution::Delivered => {
                        tracing::debug!(session = %self.session, id, "Notified ack waiter")
                    }
                    Resolution::Stored => tracing::warn!(
                        session = %self.session,
                        id,
                        "Retaining ack with no registered waiter"
                    ),
                }
                Dispatched::Ack(resolution)
            }
            Frame::Notification(notification) => {
                let Some(kind) = self
                    .catalogue
                    .lookup(&notification.method)
                    .filter(|kind| kind.is_identity_bearing())
                else {
                    tracing::debug!(
                        session = %self.session,
                        method = %notification.method,
                        "Received unkeyed notification"
                    );
                    return Dispatched::Unkeyed;
                };

                match identity::hash_from_event(kind, &notification.params) {
                    Ok(key) => {
                        tracing::debug!(session = %self.session, key = %key, "Received event, storing");
                        Dispatched::Event(self.tables.resolve_event(key, notification))
                    }
                    Err(e) => {
                        tracing::warn!(
                            session = %self.session,
                            method = %notification.method,
                            "Cannot key notification: {}",
                            e
                        );
                        Dispatched::Unkeyed
                    }
                }
            }
            Frame::Malformed(reason) => {
                tracing::warn!(session = %self.session, "Invalid message dropped: {}", reason);
                Dispatched::Malformed
            }
        }
    }
}
