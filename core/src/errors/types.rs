//! Error types for authentication, tokens and status transitions
//!
//! Messages here are what callers see; the presentation layer picks the
//! HTTP status and error code.

use thiserror::Error;

/// Authentication-related errors
///
/// `InvalidCredentials` deliberately covers both "no such account" and
/// "wrong password".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("This account is inactive")]
    AccountInactive,

    #[error("Too many attempts, try again in {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Authentication credentials were not provided")]
    AuthenticationRequired,
}

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is expired")]
    TokenExpired,

    #[error("Token is invalid")]
    InvalidTokenFormat,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Token has wrong type")]
    WrongTokenType,

    #[error("Token generation failed")]
    TokenGenerationFailed,
}

/// A rejected status change.
///
/// Carries both endpoints of the attempted move and why it was refused; the
/// stored status is left as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot change {entity} status from '{from}' to '{to}': {reason}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: String,
    pub to: String,
    pub reason: String,
}

impl TransitionError {
    pub fn new(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }
}
