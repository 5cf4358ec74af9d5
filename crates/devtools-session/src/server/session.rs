//! Session: one WebSocket to one DevTools target
//!
//! A session issues commands, correlates each with its ack by request id, and
//! optionally waits for the notification the command causes, correlated by
//! identity key. The notification may arrive before the ack; the delivered
//! stores in [`CorrelationTables`] make that ordering irrelevant.

use crate::api::SessionOptions;
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::{Command, NotificationType};
use crate::server::codec::{self, AckOutcome, Notification};
use crate::server::correlation::{Claim, CorrelationTables};
use crate::server::dispatch::{DispatchLoop, DispatchState, LoopState};
use crate::server::identity;
use crate::server::transport::{
    SocketState, SocketStatus, TransportReceiver, TransportSender, WebSocketTransport, close_code,
};
use parking_lot::Mutex as ParkingLotMutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::{Notify, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

/// Outcome of [`Session::send`]
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// Request id the command was issued with
    pub id: u64,
    /// The ack's result map, validated against the command's schema if it
    /// declared one
    pub ack: Map<String, Value>,
    /// The awaited notification. `None` if none was requested, or if it did
    /// not arrive within the deadline.
    pub event: Option<Notification>,
}

/// Counts in-flight `send` calls so `disconnect` can wait for them
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

struct InFlightGuard<'a>(&'a InFlight);

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(self)
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Resolves once the session starts shutting down
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// A connection to one DevTools target
pub struct Session {
    id: Arc<str>,
    last_id: AtomicU64,
    tables: Arc<CorrelationTables>,
    sender: Arc<TokioMutex<Box<dyn TransportSender>>>,
    socket: Arc<SocketState>,
    dispatch_state: Arc<DispatchState>,
    options: SessionOptions,
    cancel: watch::Sender<bool>,
    stop_tx: ParkingLotMutex<Option<oneshot::Sender<()>>>,
    dispatch_task: TokioMutex<Option<JoinHandle<()>>>,
    in_flight: InFlight,
}

impl Session {
    /// Opens the target's debugger WebSocket and starts the dispatch loop.
    ///
    /// The session id used in logs is the last path segment of `url`
    /// (the target id for `ws://host:port/devtools/page/{id}`).
    pub async fn connect(url: &str, options: SessionOptions) -> Result<Self> {
        let (transport, message_rx) =
            WebSocketTransport::connect(url, options.headers.as_ref(), options.max_frame_size)
                .await?;
        let socket = transport.socket_state();
        let (sender, receiver) = transport.into_parts();

        let session = Self::start(
            session_id_from_url(url),
            sender,
            receiver,
            message_rx,
            socket,
            options,
        );
        tracing::info!(session = %session.id, "Connected to DevTools target {}", url);
        Ok(session)
    }

    /// Starts a session over an already-open transport.
    ///
    /// Must be called from within a Tokio runtime: the dispatch loop is
    /// spawned immediately.
    pub fn start(
        id: impl Into<Arc<str>>,
        sender: impl TransportSender + 'static,
        receiver: impl TransportReceiver + 'static,
        message_rx: mpsc::UnboundedReceiver<String>,
        socket: Arc<SocketState>,
        options: SessionOptions,
    ) -> Self {
        let id: Arc<str> = id.into();
        let tables = Arc::new(CorrelationTables::new());
        let dispatch_state = Arc::new(DispatchState::new());
        let sender: Arc<TokioMutex<Box<dyn TransportSender>>> =
            Arc::new(TokioMutex::new(Box::new(sender)));
        let (stop_tx, stop_rx) = oneshot::channel();

        let dispatch = DispatchLoop::new(
            Arc::clone(&id),
            Arc::clone(&tables),
            Arc::clone(&options.catalogue),
            Arc::clone(&dispatch_state),
        );
        let dispatch_task = tokio::spawn(dispatch.run(
            Box::new(receiver),
            message_rx,
            Arc::clone(&sender),
            stop_rx,
        ));

        let (cancel, _) = watch::channel(false);

        Self {
            id,
            last_id: AtomicU64::new(0),
            tables,
            sender,
            socket,
            dispatch_state,
            options,
            cancel,
            stop_tx: ParkingLotMutex::new(Some(stop_tx)),
            dispatch_task: TokioMutex::new(Some(dispatch_task)),
            in_flight: InFlight::default(),
        }
    }

    /// Issues `command` and waits for its ack, and optionally for the
    /// notification of type `await_event` that the command causes.
    ///
    /// # Errors
    ///
    /// - [`Error::UnhashableType`] if `await_event` is not identity-bearing
    ///   (raised before anything is sent)
    /// - [`Error::UnknownNotificationType`] if `await_event` differs from the
    ///   descriptor registered under its name in the session's catalogue
    ///   (raised before anything is sent)
    /// - [`Error::SessionClosed`] if the session has stopped
    /// - [`Error::Timeout`] if no ack arrives within the deadline
    /// - [`Error::Protocol`] for a remote error object, or when the socket
    ///   closed with code 1002, 1006, 1007 or 1009 while waiting
    /// - [`Error::ValidationError`] if the ack result does not match the
    ///   command's declared schema
    /// - [`Error::Cancelled`] if the session is disconnected meanwhile
    ///
    /// Once a valid ack has been received it is always returned: if the
    /// notification does not arrive in time, or the ack result lacks a
    /// declared identity field, the result carries the ack and `event: None`.
    pub async fn send(
        &self,
        command: &Command,
        await_event: Option<&NotificationType>,
    ) -> Result<CommandResult> {
        if let Some(kind) = await_event {
            if !kind.is_identity_bearing() {
                return Err(Error::UnhashableType(kind.name().to_string()));
            }
            if self.options.catalogue.lookup(kind.name()) != Some(kind) {
                return Err(Error::UnknownNotificationType(kind.name().to_string()));
            }
        }

        let _in_flight = self.in_flight.enter();
        let mut cancel = self.cancel.subscribe();
        if *cancel.borrow_and_update() || self.dispatch_state.get() == LoopState::Stopped {
            return Err(Error::SessionClosed(format!(
                "cannot send \"{}\" on session {}",
                command.method(),
                self.id
            )));
        }

        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                tracing::warn!(
                    session = %self.id,
                    id,
                    method = command.method(),
                    "Cancelling in-flight command"
                );
                Err(Error::Cancelled {
                    method: command.method().to_string(),
                    id,
                })
            }
            result = self.issue(id, command, await_event) => result,
        }
    }

    async fn issue(
        &self,
        id: u64,
        command: &Command,
        await_event: Option<&NotificationType>,
    ) -> Result<CommandResult> {
        let method = command.method();
        let deadline = self.options.timeout;

        let mut ack_waiter = self.tables.register_ack_waiter(id)?;
        // The loop may have stopped and released its waiters just before we registered
        if self.dispatch_state.get() == LoopState::Stopped {
            return Err(self.closure_error(method, id).unwrap_or_else(|| {
                Error::SessionClosed(format!("cannot send \"{}\" on session {}", method, self.id))
            }));
        }
        let text = codec::encode(id, command)?;
        tracing::info!(session = %self.id, id, method, "Sending command");
        tracing::debug!(session = %self.id, id, "Request JSON: {}", text);

        let sent =
            tokio::time::timeout(deadline, async { self.sender.lock().await.send(text).await })
                .await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(session = %self.id, id, method, "Failed to send command: {}", e);
                return Err(self.closure_error(method, id).unwrap_or(e));
            }
            Err(_) => {
                tracing::error!(session = %self.id, id, method, "Timed out sending command");
                return Err(self.wait_failure(method, id));
            }
        }

        tracing::debug!(session = %self.id, id, "Waiting for ack");
        let ack = match tokio::time::timeout(deadline, ack_waiter.wait()).await {
            Ok(Some(ack)) => ack,
            Ok(None) => {
                return Err(self.closure_error(method, id).unwrap_or_else(|| {
                    Error::SessionClosed(format!(
                        "socket closed while waiting for \"{}\" with id={}",
                        method, id
                    ))
                }));
            }
            Err(_) => {
                tracing::error!(session = %self.id, id, method, "Timed out waiting for ack");
                return Err(self.wait_failure(method, id));
            }
        };
        drop(ack_waiter);
        tracing::debug!(session = %self.id, id, "Received ack");

        let result = match ack.outcome {
            AckOutcome::Result(result) => result,
            AckOutcome::Error(error) => {
                let message = if error.message.is_empty() {
                    "Unknown error".to_string()
                } else {
                    error.message
                };
                let err = ProtocolError::Remote {
                    code: error.code,
                    message,
                    id,
                };
                tracing::error!(session = %self.id, id, method, "{}", err);
                return Err(err.into());
            }
        };

        if let Some(schema) = command.result_schema() {
            tracing::debug!(session = %self.id, id, "Validating ack result");
            schema.validate(method, &result)?;
        }

        let event = match await_event {
            Some(kind) => self.await_event(id, kind, &result).await?,
            None => None,
        };

        tracing::info!(session = %self.id, id, method, "Command completed");
        Ok(CommandResult {
            id,
            ack: result,
            event,
        })
    }

    async fn await_event(
        &self,
        id: u64,
        kind: &NotificationType,
        result: &Map<String, Value>,
    ) -> Result<Option<Notification>> {
        let key = match identity::hash_from_ack_result(kind, result) {
            Ok(key) => key,
            Err(e @ Error::MissingIdentityField { .. }) => {
                tracing::warn!(session = %self.id, id, "Cannot key awaited event: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match self.tables.claim_event(key.clone())? {
            Claim::Ready(notification) => {
                tracing::debug!(session = %self.id, id, key = %key, "Fetched stored event");
                Ok(Some(notification))
            }
            Claim::Waiting(mut waiter) => {
                tracing::debug!(session = %self.id, id, key = %key, "Waiting for event");
                match tokio::time::timeout(self.options.timeout, waiter.wait()).await {
                    Ok(Some(notification)) => Ok(Some(notification)),
                    Ok(None) => {
                        tracing::warn!(
                            session = %self.id,
                            id,
                            key = %key,
                            "Session stopped before event arrived"
                        );
                        Ok(None)
                    }
                    Err(_) => {
                        tracing::warn!(
                            session = %self.id,
                            id,
                            key = %key,
                            "Timed out waiting for event, returning ack only"
                        );
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Classified protocol error if the socket closed with a known abnormal code
    fn closure_error(&self, method: &str, id: u64) -> Option<Error> {
        let SocketStatus::Closed { code: Some(code) } = self.socket.status() else {
            return None;
        };
        let method = method.to_string();
        let error = match code {
            close_code::PROTOCOL_ERROR => ProtocolError::Violation { method, id },
            close_code::ABNORMAL => ProtocolError::IncompleteRead { method, id },
            close_code::INVALID_PAYLOAD => ProtocolError::InvalidText { method, id },
            close_code::MESSAGE_TOO_BIG => ProtocolError::PayloadTooLarge {
                method,
                id,
                limit: self.options.max_frame_size,
            },
            _ => return None,
        };
        Some(error.into())
    }

    fn wait_failure(&self, method: &str, id: u64) -> Error {
        self.closure_error(method, id)
            .unwrap_or_else(|| Error::Timeout {
                method: method.to_string(),
                id,
                timeout_ms: u64::try_from(self.options.timeout.as_millis()).unwrap_or(u64::MAX),
            })
    }

    /// Cancels in-flight commands and waits for them to return, stops the
    /// dispatch loop and waits for it, closing the socket. Safe to call more
    /// than once.
    pub async fn disconnect(&self) {
        let already = self.cancel.send_replace(true);
        if !already {
            tracing::debug!(session = %self.id, "Disconnecting session...");
        }

        let pending = self.in_flight.count();
        if pending > 0 {
            tracing::warn!(session = %self.id, pending, "Cancelling in-flight commands");
        }
        self.in_flight.wait_idle().await;

        if let Some(stop) = self.stop_tx.lock().take() {
            let _ = stop.send(());
        }

        let task = self.dispatch_task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(session = %self.id, "Dispatch loop ended abnormally: {}", e);
            }
            tracing::info!(session = %self.id, "Disconnected");
        }
    }

    /// Session id used in logs
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The most recently allocated request id (0 before the first send)
    pub fn last_request_id(&self) -> u64 {
        self.last_id.load(Ordering::SeqCst)
    }

    pub fn loop_state(&self) -> LoopState {
        self.dispatch_state.get()
    }

    /// True once the session is disconnecting or its dispatch loop stopped
    pub fn is_closed(&self) -> bool {
        *self.cancel.borrow() || self.loop_state() == LoopState::Stopped
    }

    pub fn socket_status(&self) -> SocketStatus {
        self.socket.status()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    #[doc(hidden)]
    pub fn tables(&self) -> &CorrelationTables {
        &self.tables
    }
}

fn session_id_from_url(url: &str) -> String {
    let last_segment = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
    });
    last_segment.unwrap_or_else(|| url.to_string())
}
