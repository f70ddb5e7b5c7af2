//! Protocol error types.

use thiserror::Error;

/// Result type for codec operations that may hit the channel.
pub type WireResult<T> = Result<T, WireError>;

/// Transport failures.
///
/// Once a channel reports one of these it is dead and every later operation
/// returns `Disconnected`. A timeout is reported as `TimedOut` only by the
/// operation it interrupted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The underlying pipe or socket is broken.
    #[error("driver channel disconnected: {reason}")]
    Disconnected { reason: String },

    /// The timeout configured on the underlying handle expired.
    #[error("timeout during {operation}")]
    TimedOut { operation: &'static str },
}

impl ChannelError {
    /// Creates a disconnected error.
    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected {
            reason: reason.into(),
        }
    }
}

/// Malformed or incomplete data on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The peer closed the stream before a whole field arrived.
    #[error("truncated field: expected {expected} bytes, got {received}")]
    Truncated { expected: usize, received: usize },

    /// A declared length exceeds the configured limit.
    #[error("oversized field: {declared} declared (max: {max})")]
    OversizedField { declared: u64, max: u64 },

    /// String payload is not UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A decoded value does not have the shape the caller asked for.
    #[error("unexpected value: expected {expected}, found {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },
}

/// Either side of a codec failure.
///
/// Kept as two variants so callers can tell a broken transport from a
/// corrupt payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
