//! Call status codes.
//!
//! Every call is answered with a 4-byte big-endian status. Zero means the
//! procedure succeeded and its result fields follow; anything else means the
//! driver refused the operation and nothing follows.

use std::fmt;

/// Size of the status field on the wire.
pub const STATUS_SIZE: usize = 4;

/// Status code for success.
pub const STATUS_OK: i32 = 0;

/// Outcome reported by the driver for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Failure(FailureCode),
}

impl CallStatus {
    /// Decodes a status from its wire code.
    pub fn from_code(code: i32) -> Self {
        if code == STATUS_OK {
            Self::Success
        } else {
            Self::Failure(FailureCode::from_code(code))
        }
    }

    /// Returns the wire code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => STATUS_OK,
            Self::Failure(failure) => failure.code(),
        }
    }

    /// Encodes the status for the wire.
    pub fn to_be_bytes(self) -> [u8; STATUS_SIZE] {
        self.code().to_be_bytes()
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Reason a driver gave for rejecting a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    /// Unspecified failure.
    Generic,
    /// The driver does not provide this procedure.
    NotImplemented,
    /// The named database, table, column or index does not exist.
    NotFound,
    /// The object to create already exists.
    AlreadyExists,
    /// The operation would violate a constraint.
    ConstraintViolation,
    /// Driver-specific code with no name here. Never sent as 0, which
    /// would read as success; `Other(0)` goes out as `Generic`.
    Other(i32),
}

impl FailureCode {
    /// Maps a non-zero wire code to a failure.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Generic,
            2 => Self::NotImplemented,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::ConstraintViolation,
            other => Self::Other(other),
        }
    }

    /// Returns the wire code.
    pub fn code(self) -> i32 {
        match self {
            Self::Generic => 1,
            Self::NotImplemented => 2,
            Self::NotFound => 3,
            Self::AlreadyExists => 4,
            Self::ConstraintViolation => 5,
            Self::Other(STATUS_OK) => Self::Generic.code(),
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => f.write_str("failed"),
            Self::NotImplemented => f.write_str("procedure not implemented by driver"),
            Self::NotFound => f.write_str("not found"),
            Self::AlreadyExists => f.write_str("already exists"),
            Self::ConstraintViolation => f.write_str("constraint violation"),
            Self::Other(code) => write!(f, "driver error code {code}"),
        }
    }
}
