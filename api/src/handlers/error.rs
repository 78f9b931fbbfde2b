//! Mapping of domain errors onto HTTP responses
//!
//! Every handler returns `Result<_, ApiError>`, so this is the only place
//! that decides status codes, error codes and the shape of the error body.

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::{header, StatusCode},
    HttpRequest, HttpResponse, ResponseError,
};
use thiserror::Error;

use cm_core::errors::{AuthError, DomainError, TokenError};
use cm_shared::validation::ValidationErrors;
use cm_shared::{error_codes, ErrorResponse};

/// Error returned by every handler
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The request could not be decoded at all
    #[error("Malformed request: {0}")]
    BadRequest(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Domain(DomainError::Validation(errors))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::from(crate::dto::into_field_errors(&errors))
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        ApiError::Domain(error.into())
    }
}

impl ApiError {
    /// Status, error code and the response body
    fn parts(&self) -> (StatusCode, &'static str, ErrorResponse) {
        let (status, code, message) = match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, error_codes::BAD_REQUEST, message.clone())
            }
            ApiError::Domain(error) => match error {
                DomainError::Validation(_) => (
                    StatusCode::BAD_REQUEST,
                    error_codes::VALIDATION_ERROR,
                    "Invalid input.".to_string(),
                ),
                DomainError::RoleMismatch { .. } => {
                    (StatusCode::BAD_REQUEST, error_codes::ROLE_MISMATCH, error.to_string())
                }
                DomainError::BookingLocked { .. } => {
                    (StatusCode::CONFLICT, error_codes::BOOKING_LOCKED, error.to_string())
                }
                DomainError::Transition(_) => {
                    (StatusCode::CONFLICT, error_codes::INVALID_TRANSITION, error.to_string())
                }
                DomainError::NotFound { resource } => (
                    StatusCode::NOT_FOUND,
                    error_codes::NOT_FOUND,
                    format!("{} not found.", resource),
                ),
                DomainError::Conflict { message } => {
                    (StatusCode::CONFLICT, error_codes::CONFLICT, message.clone())
                }
                DomainError::PermissionDenied { message } => {
                    (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED, message.clone())
                }
                DomainError::Internal { .. } | DomainError::Token(TokenError::TokenGenerationFailed) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_codes::INTERNAL_ERROR,
                    "An internal error occurred.".to_string(),
                ),
                DomainError::Auth(auth) => match auth {
                    AuthError::InvalidCredentials | AuthError::AccountInactive => {
                        (StatusCode::UNAUTHORIZED, error_codes::AUTHENTICATION_FAILED, auth.to_string())
                    }
                    AuthError::AuthenticationRequired => {
                        (StatusCode::UNAUTHORIZED, error_codes::UNAUTHORIZED, auth.to_string())
                    }
                    AuthError::RateLimitExceeded { .. } => (
                        StatusCode::TOO_MANY_REQUESTS,
                        error_codes::RATE_LIMIT_EXCEEDED,
                        auth.to_string(),
                    ),
                },
                DomainError::Token(token) => {
                    let code = match token {
                        TokenError::TokenExpired => error_codes::TOKEN_EXPIRED,
                        TokenError::TokenRevoked => error_codes::TOKEN_REVOKED,
                        _ => error_codes::TOKEN_INVALID,
                    };
                    (StatusCode::UNAUTHORIZED, code, token.to_string())
                }
            },
        };

        let mut body = ErrorResponse::new(code, message);
        if let ApiError::Domain(error) = self {
            body = match error {
                DomainError::Validation(errors) => body.with_detail("fields", errors.to_field_errors()),
                DomainError::RoleMismatch {
                    field,
                    expected,
                    actual,
                } => body
                    .with_detail("field", field)
                    .with_detail("expected", expected)
                    .with_detail("actual", actual),
                DomainError::BookingLocked { status } => body.with_detail("status", status),
                DomainError::Transition(transition) => body
                    .with_detail("from", &transition.from)
                    .with_detail("to", &transition.to),
                DomainError::Auth(AuthError::RateLimitExceeded {
                    retry_after_seconds,
                }) => body.with_detail("retry_after", retry_after_seconds),
                _ => body,
            };
        }
        (status, code, body)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, code, body) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
        }

        let mut response = HttpResponse::build(status);
        if let ApiError::Domain(DomainError::Auth(AuthError::RateLimitExceeded {
            retry_after_seconds,
        })) = self
        {
            response.insert_header((header::RETRY_AFTER, retry_after_seconds.to_string()));
        }
        response.json(body)
    }
}

/// Malformed JSON bodies become 400 `BAD_REQUEST` in the common error shape
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

/// Path segments that are not valid ids read as missing resources
pub fn path_error_handler(_err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Domain(DomainError::not_found("Resource")).into()
}
