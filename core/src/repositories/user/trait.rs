//! User repository trait defining the interface for account persistence.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::entities::user::User;
use crate::errors::DomainError;

/// Repository trait for User entity persistence operations
///
/// Emails are stored lowercase and are unique; implementations must reject a
/// second account with the same email even when both inserts race.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their unique identifier
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;

    /// Find a user by email, compared case-insensitively
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Insert a new user
    ///
    /// # Returns
    /// * `Ok(User)` - The stored user
    /// * `Err(DomainError::Validation)` - keyed to `email` when the address is taken
    async fn create(&self, user: User) -> Result<User, DomainError>;

    /// Replace a stored user
    ///
    /// # Returns
    /// * `Err(DomainError::NotFound)` - no user with this id
    async fn update(&self, user: User) -> Result<User, DomainError>;

    /// Users ordered by creation time, for batch jobs
    async fn list_batch(&self, offset: u64, limit: u64) -> Result<Vec<User>, DomainError>;

    /// Overwrite both per-role rating averages
    async fn update_ratings(
        &self,
        id: Uuid,
        as_provider: Decimal,
        as_student: Decimal,
    ) -> Result<(), DomainError>;
}

/// The error every implementation returns for a taken email
pub fn duplicate_email_error() -> DomainError {
    DomainError::invalid("email", "A user with this email already exists.", "unique")
}
