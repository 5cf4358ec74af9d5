// Error types for devtools-session

use thiserror::Error;

/// Result type alias for devtools-session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a DevTools target
#[derive(Debug, Error)]
pub enum Error {
    /// No acknowledgement arrived within the deadline and the socket gave no
    /// reason for it.
    ///
    /// The session is still usable; the caller may retry or give up.
    #[error("Unknown cause for timeout after {timeout_ms}ms for \"{method}\" with id={id}")]
    Timeout {
        method: String,
        id: u64,
        timeout_ms: u64,
    },

    /// Protocol-level failure: an explicit error object from the remote side,
    /// or an abnormal socket closure observed while waiting.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The ack result did not match the command's declared result schema
    #[error(
        "Validation failed for \"{method}\": field '{field}' expected {expected}, got {actual}"
    )]
    ValidationError {
        method: String,
        field: String,
        expected: String,
        actual: String,
    },

    /// An event await was requested on a notification type that carries no
    /// identity fields.
    #[error("Cannot await notification type \"{0}\": it is not identity-bearing")]
    UnhashableType(String),

    /// An event await named a notification type the session's catalogue does
    /// not describe identically, so the dispatch loop would never key it.
    #[error("Cannot await notification type \"{0}\": not registered in the session's event catalogue")]
    UnknownNotificationType(String),

    /// A declared identity field was absent from the source payload
    #[error("Identity field '{field}' missing for notification type \"{notification}\"")]
    MissingIdentityField {
        notification: String,
        field: String,
    },

    /// Another in-flight command is already waiting on this key
    #[error("A waiter is already registered for {0}")]
    DuplicateWaiter(String),

    /// The session has stopped (disconnected, or its socket failed)
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// The command was cancelled because the session is disconnecting
    #[error("Command \"{method}\" with id={id} cancelled by disconnect")]
    Cancelled { method: String, id: u64 },

    /// Failed to establish the WebSocket connection
    #[error("Failed to connect to DevTools target: {0}")]
    ConnectionFailed(String),

    /// Transport-level error (WebSocket read/write)
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Failed to list targets over the HTTP discovery endpoint
    #[error("Target discovery failed: {0}")]
    Discovery(String),

    /// `Runtime.evaluate` reported a thrown exception
    #[error("Script error: {reason}: {details}")]
    ScriptError {
        reason: String,
        details: serde_json::Value,
    },

    /// A helper received an ack it could not interpret
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid argument provided to method
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with additional context
    #[error("{0}: {1}")]
    Context(String, #[source] Box<Error>),
}

/// Why a command failed at the protocol level.
///
/// The closure variants correspond to WebSocket close codes 1002, 1006, 1007
/// and 1009, observed when a wait ends with the socket no longer open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The remote side answered with an `error` object
    #[error("{message}, code {code} for id={id}")]
    Remote { code: i64, message: String, id: u64 },

    #[error("WebSocket protocol error occurred for \"{method}\" with id={id}")]
    Violation { method: String, id: u64 },

    #[error("Incomplete read error occurred for \"{method}\" with id={id}")]
    IncompleteRead { method: String, id: u64 },

    #[error("Text decode error occurred for \"{method}\" with id={id}")]
    InvalidText { method: String, id: u64 },

    #[error(
        "Received payload exceeded {limit} bytes for \"{method}\" with id={id}, consider increasing max_frame_size"
    )]
    PayloadTooLarge {
        method: String,
        id: u64,
        limit: usize,
    },
}

impl Error {
    /// Adds context to the error
    pub fn context(self, msg: impl Into<String>) -> Self {
        Error::Context(msg.into(), Box::new(self))
    }

    /// True for an unclassified deadline expiry
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Context(_, inner) => inner.is_timeout(),
            _ => false,
        }
    }

    /// The remote error code, if the remote side answered with an error object
    pub fn protocol_code(&self) -> Option<i64> {
        match self {
            Error::Protocol(ProtocolError::Remote { code, .. }) => Some(*code),
            Error::Context(_, inner) => inner.protocol_code(),
            _ => None,
        }
    }
}
