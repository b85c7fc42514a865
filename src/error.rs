use thiserror::Error;

use crate::ua;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type of the runtime.
///
/// Every fallible operation returns one of these kinds. Service adapters
/// translate them into wire-level [`ua::StatusCode`] values with
/// [`Error::to_status_code()`].
#[derive(Debug, Error)]
pub enum Error {
    /// Null or out-of-range arguments.
    #[error("invalid parameters")]
    InvalidParameters,
    /// Operation not legal in the current state.
    #[error("invalid state")]
    InvalidState,
    /// Allocation failure.
    #[error("out of memory")]
    OutOfMemory,
    /// Non-blocking operation would have blocked.
    #[error("operation would block")]
    WouldBlock,
    /// Peer closed the transport.
    #[error("connection closed by peer")]
    Closed,
    /// Feature is stubbed out on the current platform.
    #[error("not supported on this platform")]
    NotSupported,
    /// Failure carrying a specific OPC UA status code.
    #[error("{0}")]
    Status(ua::StatusCode),
    /// All other protocol or local failures.
    #[error("operation failed")]
    Nok,
}

impl Error {
    /// Creates an error from a wire status code.
    ///
    /// Good codes are not errors; passing one returns `Nok` so that callers
    /// cannot accidentally produce an "successful failure".
    #[must_use]
    pub fn from_status_code(status_code: ua::StatusCode) -> Self {
        if status_code.is_good() {
            Self::Nok
        } else {
            Self::Status(status_code)
        }
    }

    /// Maps the error onto the wire status code used by service adapters.
    #[must_use]
    pub fn to_status_code(&self) -> ua::StatusCode {
        match self {
            Self::InvalidParameters => ua::StatusCode::BAD_INVALID_ARGUMENT,
            Self::InvalidState => ua::StatusCode::BAD_INVALID_STATE,
            Self::OutOfMemory => ua::StatusCode::BAD_OUT_OF_MEMORY,
            Self::WouldBlock => ua::StatusCode::BAD_RESOURCE_UNAVAILABLE,
            Self::Closed => ua::StatusCode::BAD_CONNECTION_CLOSED,
            Self::NotSupported => ua::StatusCode::BAD_SERVICE_UNSUPPORTED,
            Self::Status(status_code) => *status_code,
            Self::Nok => ua::StatusCode::BAD_UNEXPECTED_ERROR,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock => Self::WouldBlock,
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => Self::Closed,
            std::io::ErrorKind::InvalidInput => Self::InvalidParameters,
            std::io::ErrorKind::OutOfMemory => Self::OutOfMemory,
            _ => Self::Nok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_round_trip() {
        let err = Error::from_status_code(ua::StatusCode::BAD_NODE_ID_UNKNOWN);
        assert_eq!(err.to_status_code(), ua::StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[test]
    fn good_status_is_not_an_error_code() {
        let err = Error::from_status_code(ua::StatusCode::GOOD);
        assert!(matches!(err, Error::Nok));
    }
}
