//! Failure reporting hook.
//!
//! Failures the client absorbs on the caller's behalf (fail-safe logout,
//! refresh failures, persistence failures) are still reported here so their
//! rate can be monitored.

use tracing::error;

use crate::error::Error;

/// Where a reported failure came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Component that observed the failure.
    pub source: &'static str,
    /// What the component did about it.
    pub message: String,
    /// HTTP status, when there was one.
    pub status: Option<u16>,
}

impl ErrorContext {
    pub fn new(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
            status: None,
        }
    }

    /// Context for `err`, with its status filled in.
    pub fn for_error(source: &'static str, message: impl Into<String>, err: &Error) -> Self {
        Self {
            status: err.status(),
            ..Self::new(source, message)
        }
    }
}

/// Sink for absorbed failures. Implementations must not block.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &Error, context: &ErrorContext);
}

/// Reports through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, err: &Error, context: &ErrorContext) {
        error!(
            source = context.source,
            status = ?context.status,
            kind = %err.kind(),
            error = %err,
            "{}",
            context.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_for_error_takes_status() {
        let err = Error::from_status(503, "down");
        let ctx = ErrorContext::for_error("logout", "proceeding with local logout", &err);
        assert_eq!(ctx.source, "logout");
        assert_eq!(ctx.status, Some(503));

        let ctx = ErrorContext::for_error("logout", "offline", &Error::Timeout);
        assert_eq!(ctx.status, None);
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        TracingReporter.report(
            &Error::Timeout,
            &ErrorContext::new("refresh_coordinator", "refresh failed"),
        );
    }
}
