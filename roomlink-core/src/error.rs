//! Error types for roomlink
//!
//! A single `Error` enum covers every failure the connection stack can
//! produce, from a refused handshake to a registration against an event
//! name the application never declared.
//!
//! # Error Categories
//!
//! - **Transport errors**: WebSocket, Handshake, Timeout, ConnectionClosed
//! - **Processing errors**: Serialization
//! - **Registration errors**: UnknownEvent, ReservedEvent
//! - **Lifecycle errors**: RetriesExhausted, Disposed, InvalidConfig
//!
//! The connection manager never returns asynchronous failures to its caller.
//! Instead it renders them through `Display` into the reactive `error` field
//! of the connection status, so these messages are user-facing.
//!
//! # Examples
//!
//! ```rust
//! use roomlink_core::Error;
//!
//! let error = Error::Handshake("401 Unauthorized".into());
//! assert!(error.is_retryable());
//!
//! let exhausted = Error::RetriesExhausted { attempts: 10 };
//! assert!(!exhausted.is_retryable());
//! ```

use thiserror::Error;

/// Result type for roomlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for roomlink operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// WebSocket transport layer error
    ///
    /// Covers connection resets, protocol violations and frame processing
    /// errors below the frame envelope.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The server refused the opening handshake (bad status, auth rejected)
    #[error("Handshake rejected: {0}")]
    Handshake(String),

    /// Serialization or deserialization error
    ///
    /// Occurs when a text message is not a valid frame envelope, or when a
    /// frame payload does not match the type a typed listener asked for.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The transport did not open within the configured deadline
    #[error("Connection timeout")]
    Timeout,

    /// Connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// A listener was registered for an event outside the known set
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// A listener or emit targeted a name the manager uses internally
    #[error("Reserved event name: {0}")]
    ReservedEvent(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The retry budget ran out; only an explicit reconnect resumes
    #[error("Reconnection abandoned after {attempts} attempts")]
    RetriesExhausted {
        /// Number of retries performed before giving up
        attempts: u32,
    },

    /// The manager has been disposed
    #[error("Connection manager disposed")]
    Disposed,
}

impl Error {
    /// Whether this failure is eligible for a backoff-scheduled retry
    ///
    /// Open failures and abnormal drops are recoverable; exhausting the
    /// retry budget, invalid configuration, registration mistakes and
    /// disposal are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::WebSocket(_)
                | Error::Handshake(_)
                | Error::Timeout
                | Error::ConnectionClosed
                | Error::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
