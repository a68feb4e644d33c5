//! Error types for buddy-client.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Closed classification of every failure the client core can surface.
///
/// Computed once, at the transport boundary, from the HTTP status (or the
/// absence of one). Callers branch on this instead of sniffing status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server rejected the session (HTTP 401).
    Unauthorized,
    /// The request never produced an HTTP response (connect, DNS, timeout).
    NetworkFailure,
    /// The server failed to handle a well-formed request (HTTP 5xx).
    ServerError,
    /// Any other rejected request: non-401 4xx responses, as well as
    /// request/response bodies that fail local validation.
    ValidationError,
}

impl ErrorKind {
    /// Classify an HTTP status code. Success codes have no kind.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 => Some(Self::Unauthorized),
            500..=599 => Some(Self::ServerError),
            _ => Some(Self::ValidationError),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::NetworkFailure => "network_failure",
            Self::ServerError => "server_error",
            Self::ValidationError => "validation_error",
        };
        f.write_str(name)
    }
}

/// Failures of the persisted-session medium.
///
/// None of these are fatal: corrupt data is erased and reported, failed
/// writes leave the previous blob untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No persistent medium is configured for this process.
    #[error("No persistent storage medium available")]
    Unavailable,

    /// The persisted blob was not valid JSON. It has been erased.
    #[error("Failed to read stored user data. Data has been cleared.")]
    Unreadable,

    /// The persisted blob had the wrong shape. It has been erased.
    #[error("Invalid stored user data. Data has been cleared.")]
    Invalid {
        /// What the validator rejected.
        reason: String,
    },

    /// Writing the blob failed (quota exceeded, medium disabled, I/O).
    #[error("Failed to save user data. Storage may be full or disabled.")]
    WriteFailed {
        /// Underlying failure description.
        message: String,
    },

    /// Reading or removing the blob failed at the medium level.
    #[error("Storage I/O error: {0}")]
    Io(String),
}

/// The main error type for buddy-client.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── API ──────────────────────────────────────────────────────────────────
    /// The server answered with a non-success status.
    #[error("API error {status} ({kind}): {message}")]
    Api {
        /// Classification of the status.
        kind: ErrorKind,
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The session refresh failed; every caller waiting on it gets this.
    #[error("Session refresh failed: {0}")]
    RefreshFailed(Box<Error>),

    /// The request was rejected locally before reaching the network.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A response body could not be decoded into the expected type.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The pending operation was abandoned (session cleared, settlement dropped).
    #[error("Request cancelled")]
    Cancelled,

    // ── Storage ──────────────────────────────────────────────────────────────
    /// Persisted-session storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    // ── Infrastructure ───────────────────────────────────────────────────────
    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build the error for a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            kind: ErrorKind::from_status(status).unwrap_or(ErrorKind::ValidationError),
            status,
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { kind, .. } => *kind,
            Self::RefreshFailed(cause) => cause.kind(),
            Self::Network(_) | Self::Timeout | Self::Cancelled => ErrorKind::NetworkFailure,
            Self::InvalidRequest(_) | Self::Decode(_) | Self::Config(_) | Self::Storage(_) => {
                ErrorKind::ValidationError
            }
        }
    }

    /// HTTP status that produced this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RefreshFailed(cause) => cause.status(),
            _ => None,
        }
    }

    /// Returns true if the server rejected the session.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(Arc::new(err))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_status() {
        assert_eq!(ErrorKind::from_status(200), None);
        assert_eq!(ErrorKind::from_status(204), None);
        assert_eq!(ErrorKind::from_status(401), Some(ErrorKind::Unauthorized));
        assert_eq!(ErrorKind::from_status(403), Some(ErrorKind::ValidationError));
        assert_eq!(ErrorKind::from_status(422), Some(ErrorKind::ValidationError));
        assert_eq!(ErrorKind::from_status(500), Some(ErrorKind::ServerError));
        assert_eq!(ErrorKind::from_status(503), Some(ErrorKind::ServerError));
    }

    #[test]
    fn test_refresh_failed_delegates_to_cause() {
        let err = Error::RefreshFailed(Box::new(Error::from_status(401, "expired")));
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());

        let err = Error::RefreshFailed(Box::new(Error::Timeout));
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_local_failures_are_validation_errors() {
        assert_eq!(
            Error::InvalidRequest("bad".into()).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            Error::Storage(StorageError::Unavailable).kind(),
            ErrorKind::ValidationError
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::from_status(500, "boom");
        assert_eq!(err.to_string(), "API error 500 (server_error): boom");

        let err = Error::Storage(StorageError::Invalid {
            reason: "profiles".into(),
        });
        assert!(err.to_string().contains("Data has been cleared"));
    }
}
