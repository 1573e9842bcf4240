use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// What went wrong with the socket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkErrorKind {
    /// the network request can not be sent or got no response
    NetworkFailed,
    /// the underlying socket reported a failure
    SocketFailure,
    /// the server closed the socket
    SocketClosed,
    /// a frame from the server can not be parsed
    ParserError,
    /// auth token expired, a refreshed one will be tried
    TokenExpired,
    /// auth token is malformed or has a bad signature
    InvalidToken,
    /// no auth token provided for a user connection
    UndefinedToken,
    /// api key unknown to the server
    ApiKeyNotFound,
    /// the user is not allowed to connect
    Unauthorized,
    /// server and client speak incompatible protocol versions
    ProtocolVersionMismatch,
    /// server error code without a dedicated kind
    Other(i32),
}

impl NetworkErrorKind {
    /// Map a server error code to error kind
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => Self::ApiKeyNotFound,
            5 | 17 => Self::Unauthorized,
            40 => Self::TokenExpired,
            41..=43 => Self::InvalidToken,
            _ => Self::Other(code),
        }
    }

    /// Check if a connection failing with this kind may be retried automatically
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidToken
                | Self::UndefinedToken
                | Self::ApiKeyNotFound
                | Self::Unauthorized
                | Self::ProtocolVersionMismatch
        )
    }
}

/// Error reported by the transport for a connection attempt or a live connection
#[derive(Debug, Clone, PartialEq, Eq, Snafu, Serialize, Deserialize)]
#[snafu(display("{kind:?} network error: {message}"))]
pub struct NetworkError {
    /// error kind
    pub kind: NetworkErrorKind,
    /// human readable description
    pub message: String,
    /// http status code of the failed handshake, if any
    pub status_code: Option<u16>,
}

impl NetworkError {
    /// Create a new error without status code
    pub fn new<S: Into<String>>(kind: NetworkErrorKind, message: S) -> Self {
        NetworkSnafu {
            kind,
            message,
            status_code: None::<u16>,
        }
        .build()
    }

    /// Attach the http status code of the failed handshake
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code.replace(status_code);
        self
    }

    /// see [NetworkErrorKind::is_recoverable]
    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}
