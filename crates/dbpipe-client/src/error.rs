//! Client error types.

use thiserror::Error;

use dbpipe_protocol::{ChannelError, FailureCode, ProtocolError, WireError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
///
/// `Driver` means the driver ran the procedure and said no; the session is
/// still usable. `Channel` and `Protocol` mean the connection itself can no
/// longer be trusted and a new session is needed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The driver rejected the call.
    #[error("{procedure} failed: {code}")]
    Driver {
        procedure: &'static str,
        code: FailureCode,
    },

    /// The transport to the driver broke.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The driver sent data that does not decode.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The session was closed before this call.
    #[error("session is closed")]
    SessionClosed,

    /// Could not reach the driver.
    #[error("connection error: {0}")]
    Connection(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns the driver's failure code when the driver rejected the call.
    pub fn failure_code(&self) -> Option<FailureCode> {
        match self {
            Self::Driver { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the driver answered with a failure status.
    pub fn is_driver_failure(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }

    /// True when the channel broke or carried garbage.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Channel(_) | Self::Protocol(_))
    }
}

impl From<WireError> for ClientError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Channel(e) => Self::Channel(e),
            WireError::Protocol(e) => Self::Protocol(e),
        }
    }
}
