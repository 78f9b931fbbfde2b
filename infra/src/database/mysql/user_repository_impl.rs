//! MySQL implementation of the UserRepository trait.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::MySqlPool;
use uuid::Uuid;

use cm_core::domain::entities::user::User;
use cm_core::errors::DomainError;
use cm_core::repositories::user::r#trait::duplicate_email_error;
use cm_core::repositories::UserRepository;

use super::{col, db_err, enum_col, is_unique_violation, uuid_col};

pub(crate) const USER_COLUMNS: &str = "id, email, password_hash, role, phone_number, university_name, \
     profile_image, is_verified, is_staff, is_active, avg_rating_as_provider, avg_rating_as_student, \
     created_at, updated_at, last_login_at";

/// MySQL implementation of UserRepository
///
/// The unique index on `email` settles concurrent registrations; a
/// violation is reported as the same validation error the service returns.
pub struct MySqlUserRepository {
    pool: MySqlPool,
}

impl MySqlUserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_user(row: &MySqlRow) -> Result<User, DomainError> {
        Ok(User {
            id: uuid_col(row, "id")?,
            email: col(row, "email")?,
            password_hash: col(row, "password_hash")?,
            role: enum_col(row, "role")?,
            phone_number: col(row, "phone_number")?,
            university_name: col(row, "university_name")?,
            profile_image: col(row, "profile_image")?,
            is_verified: col(row, "is_verified")?,
            is_staff: col(row, "is_staff")?,
            is_active: col(row, "is_active")?,
            avg_rating_as_provider: col(row, "avg_rating_as_provider")?,
            avg_rating_as_student: col(row, "avg_rating_as_student")?,
            created_at: col(row, "created_at")?,
            updated_at: col(row, "updated_at")?,
            last_login_at: col(row, "last_login_at")?,
        })
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find user by id"))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE email = ? LIMIT 1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find user by email"))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        user.validate()?;

        let query = format!(
            "INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            USER_COLUMNS
        );
        sqlx::query(&query)
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.phone_number)
            .bind(&user.university_name)
            .bind(&user.profile_image)
            .bind(user.is_verified)
            .bind(user.is_staff)
            .bind(user.is_active)
            .bind(user.avg_rating_as_provider)
            .bind(user.avg_rating_as_student)
            .bind(user.created_at)
            .bind(user.updated_at)
            .bind(user.last_login_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate_email_error()
                } else {
                    db_err("Failed to create user")(e)
                }
            })?;

        tracing::debug!(user_id = %user.id, "User row inserted");
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, DomainError> {
        user.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?, password_hash = ?, phone_number = ?, university_name = ?,
                profile_image = ?, is_verified = ?, is_staff = ?, is_active = ?,
                updated_at = ?, last_login_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(&user.university_name)
        .bind(&user.profile_image)
        .bind(user.is_verified)
        .bind(user.is_staff)
        .bind(user.is_active)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_email_error()
            } else {
                db_err("Failed to update user")(e)
            }
        })?;

        // MySQL reports zero affected rows for an unchanged row too
        if result.rows_affected() == 0 && self.find_by_id(user.id).await?.is_none() {
            return Err(DomainError::not_found("User"));
        }
        Ok(user)
    }

    async fn list_batch(&self, offset: u64, limit: u64) -> Result<Vec<User>, DomainError> {
        let query = format!(
            "SELECT {} FROM users ORDER BY created_at, id LIMIT ? OFFSET ?",
            USER_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list users"))?;

        rows.iter().map(Self::row_to_user).collect()
    }

    async fn update_ratings(&self, id: Uuid, as_provider: Decimal, as_student: Decimal) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE users SET avg_rating_as_provider = ?, avg_rating_as_student = ?, updated_at = ? WHERE id = ?",
        )
        .bind(as_provider)
        .bind(as_student)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to update user ratings"))?;

        if result.rows_affected() == 0 && self.find_by_id(id).await?.is_none() {
            return Err(DomainError::not_found("User"));
        }
        Ok(())
    }
}
