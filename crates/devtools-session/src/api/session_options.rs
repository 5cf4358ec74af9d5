use crate::protocol::EventCatalogue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for each of: sending a command, receiving its ack,
/// receiving its awaited notification.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a single inbound message (8 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

/// Environment variable overriding [`SessionOptions::timeout`], in milliseconds
pub const TIMEOUT_ENV: &str = "DEVTOOLS_TIMEOUT_MS";

/// Environment variable overriding [`SessionOptions::max_frame_size`], in bytes
pub const MAX_FRAME_SIZE_ENV: &str = "DEVTOOLS_MAX_FRAME_BYTES";

/// Options for `Session::connect`.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Deadline applied separately to the send, the ack wait and the event wait.
    pub timeout: Duration,
    /// Largest inbound message accepted before the socket is failed with
    /// close code 1009.
    pub max_frame_size: usize,
    /// Additional HTTP headers to send with the WebSocket handshake.
    pub headers: Option<HashMap<String, String>>,
    /// Notification types the session can key and await.
    pub catalogue: Arc<EventCatalogue>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            headers: None,
            catalogue: Arc::new(EventCatalogue::builtin()),
        }
    }
}

impl SessionOptions {
    /// Creates a new `SessionOptions` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by `DEVTOOLS_TIMEOUT_MS` and
    /// `DEVTOOLS_MAX_FRAME_BYTES` when set. Unparseable values are ignored
    /// with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(ms) = parse_var::<u64>(&lookup, TIMEOUT_ENV) {
            options.timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = parse_var::<usize>(&lookup, MAX_FRAME_SIZE_ENV) {
            options.max_frame_size = bytes;
        }
        options
    }

    /// Set the per-stage deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum inbound message size in bytes.
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    /// Set additional HTTP headers to send with the WebSocket handshake.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Replace the notification catalogue.
    pub fn catalogue(mut self, catalogue: EventCatalogue) -> Self {
        self.catalogue = Arc::new(catalogue);
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid number", name, raw);
            None
        }
    }
}
