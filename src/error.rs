//! Stream client error types with failure-category mapping.
//!
//! [`StreamError`] is the central error type for the client. Each variant
//! maps to an [`ErrorCategory`] describing how the session treats it.
//! Session-level failures (transport errors, malformed frames, lost
//! connections) are logged and recovered inside the session loop; only
//! [`crate::ws::StreamClient::send`], configuration loading and typed
//! payload decoding return errors to callers.

use std::fmt;

use tokio_tungstenite::tungstenite;

/// Coarse classification of a [`StreamError`].
///
/// | Category              | Handling                                      |
/// |-----------------------|-----------------------------------------------|
/// | `Transport`           | reported via `on_error`, non-fatal            |
/// | `Protocol`            | logged, frame dropped, connection kept        |
/// | `ConnectionLost`      | recovered by the bounded reconnect policy     |
/// | `ConnectionExhausted` | terminal, needs external intervention         |
/// | `Usage`               | returned to the caller (e.g. send while down) |
/// | `Configuration`       | returned from configuration loading           |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Low-level socket failure.
    Transport,
    /// Malformed frame, unknown message type or undecodable payload.
    Protocol,
    /// Unclean close; retried automatically.
    ConnectionLost,
    /// Retry budget consumed.
    ConnectionExhausted,
    /// Caller misuse of the public surface.
    Usage,
    /// Invalid configuration value.
    Configuration,
}

impl ErrorCategory {
    /// Returns the category as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::ConnectionLost => "connection_lost",
            Self::ConnectionExhausted => "connection_exhausted",
            Self::Usage => "usage",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the operations stream client.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Error raised by the underlying websocket library.
    #[error("websocket transport error: {0}")]
    Transport(#[source] Box<tungstenite::Error>),

    /// The transport was closed underneath an operation.
    #[error("connection is closed")]
    ConnectionClosed,

    /// A message was sent while the transport was not open.
    #[error("not connected; message dropped")]
    NotConnected,

    /// An inbound frame could not be parsed as a message envelope.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// An inbound envelope carried a `type` the client does not handle.
    #[error("unrecognized message type: {0}")]
    UnknownMessageType(String),

    /// The `data` of a recognized message did not match its record shape.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// Wire tag of the message whose payload failed to decode.
        kind: &'static str,
        /// Underlying decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// The connection closed uncleanly.
    #[error("connection lost (code {code}): {reason}")]
    ConnectionLost {
        /// Websocket close code.
        code: u16,
        /// Close reason sent by the peer, if any.
        reason: String,
    },

    /// Every reconnect attempt in the budget failed.
    #[error("reconnect budget exhausted after {attempts} attempts")]
    ConnectionExhausted {
        /// Number of reconnect attempts made.
        attempts: u32,
    },

    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StreamError {
    /// Returns the failure category for this variant.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::ConnectionClosed => ErrorCategory::Transport,
            Self::MalformedFrame(_) | Self::UnknownMessageType(_) | Self::InvalidPayload { .. } => {
                ErrorCategory::Protocol
            }
            Self::ConnectionLost { .. } => ErrorCategory::ConnectionLost,
            Self::ConnectionExhausted { .. } => ErrorCategory::ConnectionExhausted,
            Self::NotConnected => ErrorCategory::Usage,
            Self::InvalidConfig(_) => ErrorCategory::Configuration,
        }
    }

    /// Returns `true` if the session recovers from this error on its own.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::ConnectionExhausted | ErrorCategory::Configuration
        )
    }
}

impl From<tungstenite::Error> for StreamError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
