//! Typed wrappers over the Buddy REST endpoints.
//!
//! ```text
//! /auth/login                       POST   (direct, never refreshed)
//! /auth/refresh                     POST   (refresh transport only)
//! /auth/logout                      POST   (intercepted)
//! /accounts/register                POST   (direct)
//! /accounts/verifications/request   POST   (direct)
//! /accounts/verifications/confirm   POST   (direct)
//! /pets                             GET    (direct, public cache)
//! ```
//!
//! "Direct" requests skip the refresh interceptor: they either carry their
//! own credentials or need no session at all.

pub mod accounts;
pub mod auth;
pub mod pets;

use crate::error::{Error, Result};

/// Reject blank required fields before they reach the network.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidRequest(format!("{field} is required")));
    }
    Ok(())
}

/// Minimal e-mail shape check: one `@`, non-empty local part, dotted domain.
pub(crate) fn require_email(value: &str) -> Result<()> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !value.contains(char::is_whitespace)
                && domain.contains('.')
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    };
    if !valid {
        return Err(Error::InvalidRequest(format!("invalid email address: {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_require() {
        assert!(require("password", "x").is_ok());
        let err = require("password", "  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("password is required"));
    }

    #[test]
    fn test_require_email() {
        for ok in ["a@b.co", "first.last@shelter.org.br", " a@b.io "] {
            assert!(require_email(ok).is_ok(), "{ok}");
        }
        for bad in ["", "ab.co", "@b.co", "a@", "a@b", "a@b..co", "a@@b.co", "a b@c.io", "a@b.co@d.io"] {
            assert!(require_email(bad).is_err(), "{bad}");
        }
    }
}
