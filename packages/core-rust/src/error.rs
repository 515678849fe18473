//! Closed set of error kinds shared by both transports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification tag carried by every domain error.
///
/// The set is closed: transports map each kind to a fixed status, and the
/// RPC wire format carries the kind verbatim so clients can branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyExists,
    BadRequest,
    NotFound,
    InvalidRequest,
    ConnectionUnavailable,
    Internal,
}

impl ErrorKind {
    /// Stable upper-case label used in logs and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::ConnectionUnavailable => "CONNECTION_UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
