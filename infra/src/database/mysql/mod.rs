//! MySQL repository implementations
//!
//! Ids are stored as `CHAR(36)` and bound as strings. Enum columns hold the
//! same lowercase strings the API uses.

mod booking_repository_impl;
mod furniture_repository_impl;
mod moving_service_repository_impl;
mod review_repository_impl;
mod token_repository_impl;
mod user_repository_impl;

pub use booking_repository_impl::MySqlBookingRepository;
pub use furniture_repository_impl::MySqlFurnitureRepository;
pub use moving_service_repository_impl::MySqlMovingServiceRepository;
pub use review_repository_impl::MySqlReviewRepository;
pub use token_repository_impl::MySqlTokenRepository;
pub use user_repository_impl::MySqlUserRepository;

use std::str::FromStr;

use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Row};
use uuid::Uuid;

use cm_core::errors::DomainError;
use cm_shared::{PaginatedResponse, Pagination};

/// Wrap a sqlx error with what was being attempted
pub(crate) fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::internal(format!("{}: {}", context, e))
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

pub(crate) fn col<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(name)
        .map_err(|e| DomainError::internal(format!("Failed to get {}: {}", name, e)))
}

pub(crate) fn uuid_col(row: &MySqlRow, name: &str) -> Result<Uuid, DomainError> {
    let raw: String = col(row, name)?;
    Uuid::parse_str(&raw).map_err(|e| DomainError::internal(format!("Invalid UUID in {}: {}", name, e)))
}

/// Decode a string column into one of the domain's string enums
pub(crate) fn enum_col<T>(row: &MySqlRow, name: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = String>,
{
    let raw: String = col(row, name)?;
    raw.parse().map_err(DomainError::internal)
}

/// Assemble a page from its rows and the unpaged total
pub(crate) fn page<T>(results: Vec<T>, pagination: Pagination, total: i64) -> PaginatedResponse<T> {
    PaginatedResponse::new(results, pagination, total.max(0) as u64)
}

/// `%value%` with LIKE wildcards in `value` escaped
pub(crate) fn contains_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
