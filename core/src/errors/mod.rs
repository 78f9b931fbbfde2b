//! Domain-specific error types and error handling.

mod types;

pub use types::{AuthError, TokenError, TransitionError};

use cm_shared::validation::{ValidationError, ValidationErrors};
use thiserror::Error;

use crate::domain::entities::booking::BookingStatus;
use crate::domain::entities::user::UserRole;

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    /// Field validation failures, keyed by field name
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// A referenced user does not carry the role the relationship needs
    #[error("{field} must be a {expected} (found {actual})")]
    RoleMismatch {
        field: String,
        expected: UserRole,
        actual: UserRole,
    },

    /// A booking in a terminal status was edited
    #[error("Booking is {status} and can no longer be modified")]
    BookingLocked { status: BookingStatus },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl DomainError {
    /// Single-field validation error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        DomainError::Validation(ValidationError::new(field, message, code).into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        DomainError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        DomainError::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        DomainError::Internal {
            message: message.to_string(),
        }
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Validation(errors)
    }
}

impl From<ValidationError> for DomainError {
    fn from(error: ValidationError) -> Self {
        DomainError::Validation(error.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_is_keyed_to_field() {
        match DomainError::invalid("phone_number", "too short", "phone_too_short") {
            DomainError::Validation(errors) => assert!(errors.has_field("phone_number")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_role_mismatch_message() {
        let err = DomainError::RoleMismatch {
            field: "provider".to_string(),
            expected: UserRole::Provider,
            actual: UserRole::Student,
        };
        assert_eq!(err.to_string(), "provider must be a provider (found student)");
    }

    #[test]
    fn test_transition_bridge() {
        let err: DomainError = TransitionError::new("booking", "pending", "completed", "confirm first").into();
        assert!(matches!(err, DomainError::Transition(_)));
        assert!(err.to_string().contains("'pending' to 'completed'"));
    }
}
