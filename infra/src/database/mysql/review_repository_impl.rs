//! MySQL implementation of the ReviewRepository trait.
//!
//! Creating, editing or deleting a review recomputes the aggregates it feeds
//! inside the same transaction. Rows are locked booking, service, reviewee,
//! then the review itself, and the ratings are read with shared locks so a
//! concurrent change for the same reviewee is always counted by whichever
//! transaction commits last.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlConnection, MySqlPool};
use uuid::Uuid;

use cm_core::domain::entities::booking::BookingStatus;
use cm_core::domain::entities::review::{ReceivedReview, Review};
use cm_core::domain::entities::user::UserRole;
use cm_core::domain::value_objects::money::average_rating;
use cm_core::errors::DomainError;
use cm_core::repositories::review::r#trait::duplicate_review_error;
use cm_core::repositories::{ReviewDirection, ReviewRepository};
use cm_shared::{PaginatedResponse, Pagination};

use super::{col, db_err, enum_col, is_foreign_key_violation, is_unique_violation, page, uuid_col};

const REVIEW_COLUMNS: &str =
    "r.id, r.booking_id, r.reviewer_id, r.reviewee_id, r.rating, r.comment, r.created_at, r.updated_at";

/// Join condition selecting reviews written about the provider side
const ABOUT_PROVIDER: &str = "r.reviewee_id = b.provider_id";

/// Rows a review feeds, locked for the rest of the transaction
struct AggregateTarget {
    service_id: Uuid,
    reviewee_id: Uuid,
    role: UserRole,
    booking_status: BookingStatus,
}

/// MySQL implementation of ReviewRepository
pub struct MySqlReviewRepository {
    pool: MySqlPool,
}

impl MySqlReviewRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_review(row: &MySqlRow) -> Result<Review, DomainError> {
        Ok(Review {
            id: uuid_col(row, "id")?,
            booking_id: uuid_col(row, "booking_id")?,
            reviewer_id: uuid_col(row, "reviewer_id")?,
            reviewee_id: uuid_col(row, "reviewee_id")?,
            rating: col(row, "rating")?,
            comment: col(row, "comment")?,
            created_at: col(row, "created_at")?,
            updated_at: col(row, "updated_at")?,
        })
    }

    fn ratings(rows: &[MySqlRow]) -> Result<Vec<u8>, DomainError> {
        rows.iter().map(|row| col::<u8>(row, "rating")).collect()
    }

    async fn lock_row(
        conn: &mut MySqlConnection,
        query: &'static str,
        id: Uuid,
        resource: &'static str,
    ) -> Result<MySqlRow, DomainError> {
        sqlx::query(query)
            .bind(id.to_string())
            .fetch_optional(conn)
            .await
            .map_err(db_err("Failed to lock row"))?
            .ok_or_else(|| DomainError::not_found(resource))
    }

    async fn locked_user_ratings(
        conn: &mut MySqlConnection,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Vec<u8>, DomainError> {
        let side = match role {
            UserRole::Provider => "b.provider_id",
            UserRole::Student => "b.student_id",
        };
        let query = format!(
            "SELECT r.rating FROM reviews r JOIN bookings b ON b.id = r.booking_id \
             WHERE r.reviewee_id = ? AND r.reviewee_id = {} LOCK IN SHARE MODE",
            side
        );
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(conn)
            .await
            .map_err(db_err("Failed to load user ratings"))?;
        Self::ratings(&rows)
    }

    async fn locked_service_ratings(conn: &mut MySqlConnection, service_id: Uuid) -> Result<Vec<u8>, DomainError> {
        let query = format!(
            "SELECT r.rating FROM reviews r JOIN bookings b ON b.id = r.booking_id \
             WHERE b.service_id = ? AND {} LOCK IN SHARE MODE",
            ABOUT_PROVIDER
        );
        let rows = sqlx::query(&query)
            .bind(service_id.to_string())
            .fetch_all(conn)
            .await
            .map_err(db_err("Failed to load service ratings"))?;
        Self::ratings(&rows)
    }

    /// Lock the booking, the service (for reviews of the provider) and the
    /// reviewee, in that order
    async fn lock_targets(
        conn: &mut MySqlConnection,
        booking_id: Uuid,
        reviewee_id: Uuid,
    ) -> Result<AggregateTarget, DomainError> {
        let booking = Self::lock_row(
            conn,
            "SELECT service_id, provider_id, status FROM bookings WHERE id = ? FOR UPDATE",
            booking_id,
            "Booking",
        )
        .await?;
        let service_id = uuid_col(&booking, "service_id")?;
        let provider_id = uuid_col(&booking, "provider_id")?;
        let booking_status: BookingStatus = enum_col(&booking, "status")?;

        let role = if reviewee_id == provider_id {
            UserRole::Provider
        } else {
            UserRole::Student
        };
        if role == UserRole::Provider {
            Self::lock_row(
                conn,
                "SELECT id FROM moving_services WHERE id = ? FOR UPDATE",
                service_id,
                "Moving service",
            )
            .await?;
        }
        Self::lock_row(conn, "SELECT id FROM users WHERE id = ? FOR UPDATE", reviewee_id, "User").await?;

        Ok(AggregateTarget {
            service_id,
            reviewee_id,
            role,
            booking_status,
        })
    }

    /// Rewrite the reviewee's per-role average and, for reviews of the
    /// provider, the service aggregate from the ratings now present
    async fn refresh_aggregates(conn: &mut MySqlConnection, target: &AggregateTarget) -> Result<Decimal, DomainError> {
        let now = Utc::now();
        let user_average = average_rating(Self::locked_user_ratings(conn, target.reviewee_id, target.role).await?)
            .unwrap_or(Decimal::ZERO);
        let column = match target.role {
            UserRole::Provider => "avg_rating_as_provider",
            UserRole::Student => "avg_rating_as_student",
        };
        sqlx::query(&format!("UPDATE users SET {} = ?, updated_at = ? WHERE id = ?", column))
            .bind(user_average)
            .bind(now)
            .bind(target.reviewee_id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(db_err("Failed to update user rating"))?;

        if target.role == UserRole::Provider {
            let ratings = Self::locked_service_ratings(conn, target.service_id).await?;
            let total = ratings.len() as u32;
            let service_average = average_rating(ratings).unwrap_or(Decimal::ZERO);
            sqlx::query("UPDATE moving_services SET rating_average = ?, total_reviews = ?, updated_at = ? WHERE id = ?")
                .bind(service_average)
                .bind(total)
                .bind(now)
                .bind(target.service_id.to_string())
                .execute(&mut *conn)
                .await
                .map_err(db_err("Failed to update service rating"))?;
        }
        Ok(user_average)
    }

    async fn fetch_review(conn: &mut MySqlConnection, id: Uuid, for_update: bool) -> Result<Option<Review>, DomainError> {
        let query = format!(
            "SELECT {} FROM reviews r WHERE r.id = ?{}",
            REVIEW_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(conn)
            .await
            .map_err(db_err("Failed to find review"))?;

        row.as_ref().map(Self::row_to_review).transpose()
    }

    /// Load a review and lock everything it feeds. The unlocked first read
    /// only finds the booking and reviewee, which never change.
    async fn lock_existing(conn: &mut MySqlConnection, id: Uuid) -> Result<(Review, AggregateTarget), DomainError> {
        let current = Self::fetch_review(conn, id, false)
            .await?
            .ok_or_else(|| DomainError::not_found("Review"))?;
        let target = Self::lock_targets(conn, current.booking_id, current.reviewee_id).await?;
        let current = Self::fetch_review(conn, id, true)
            .await?
            .ok_or_else(|| DomainError::not_found("Review"))?;
        Ok((current, target))
    }

    async fn count(&self, query: &str, id: Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar(query)
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count reviews"))
    }
}

#[async_trait]
impl ReviewRepository for MySqlReviewRepository {
    async fn create(&self, review: Review) -> Result<Review, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let target = Self::lock_targets(&mut tx, review.booking_id, review.reviewee_id).await?;
        if target.booking_status != BookingStatus::Completed {
            return Err(DomainError::invalid(
                "booking",
                "You can only review completed bookings.",
                "booking_not_completed",
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO reviews (id, booking_id, reviewer_id, reviewee_id, rating, comment, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(review.id.to_string())
        .bind(review.booking_id.to_string())
        .bind(review.reviewer_id.to_string())
        .bind(review.reviewee_id.to_string())
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_review_error()
            } else if is_foreign_key_violation(&e) {
                DomainError::not_found("User")
            } else {
                db_err("Failed to create review")(e)
            }
        })?;

        let average = Self::refresh_aggregates(&mut tx, &target).await?;
        tx.commit().await.map_err(db_err("Failed to commit review"))?;
        tracing::debug!(review_id = %review.id, role = %target.role, average = %average, "Review aggregates refreshed");
        Ok(review)
    }

    async fn update(&self, review: Review) -> Result<Review, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        let (current, target) = Self::lock_existing(&mut tx, review.id).await?;

        sqlx::query("UPDATE reviews SET rating = ?, comment = ?, updated_at = ? WHERE id = ?")
            .bind(review.rating)
            .bind(&review.comment)
            .bind(review.updated_at)
            .bind(review.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to update review"))?;

        let average = Self::refresh_aggregates(&mut tx, &target).await?;
        tx.commit().await.map_err(db_err("Failed to commit review update"))?;
        tracing::debug!(review_id = %review.id, role = %target.role, average = %average, "Review aggregates refreshed");
        Ok(Review {
            rating: review.rating,
            comment: review.comment,
            updated_at: review.updated_at,
            ..current
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        let (_, target) = Self::lock_existing(&mut tx, id).await?;

        sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to delete review"))?;

        let average = Self::refresh_aggregates(&mut tx, &target).await?;
        tx.commit().await.map_err(db_err("Failed to commit review deletion"))?;
        tracing::debug!(review_id = %id, role = %target.role, average = %average, "Review aggregates refreshed");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(db_err("Failed to acquire connection"))?;
        Self::fetch_review(&mut conn, id, false).await
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Review>, DomainError> {
        let query = format!("SELECT {} FROM reviews r WHERE r.booking_id = ?", REVIEW_COLUMNS);
        let row = sqlx::query(&query)
            .bind(booking_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find review"))?;

        row.as_ref().map(Self::row_to_review).transpose()
    }

    async fn list_for_service(
        &self,
        service_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Review>, DomainError> {
        let from = format!(
            "FROM reviews r JOIN bookings b ON b.id = r.booking_id WHERE b.service_id = ? AND {}",
            ABOUT_PROVIDER
        );
        let total = self.count(&format!("SELECT COUNT(*) {}", from), service_id).await?;

        let query = format!(
            "SELECT {} {} ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?",
            REVIEW_COLUMNS, from
        );
        let rows = sqlx::query(&query)
            .bind(service_id.to_string())
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list service reviews"))?;

        let reviews = rows.iter().map(Self::row_to_review).collect::<Result<Vec<_>, _>>()?;
        Ok(page(reviews, pagination, total))
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        direction: ReviewDirection,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Review>, DomainError> {
        let column = match direction {
            ReviewDirection::Received => "r.reviewee_id",
            ReviewDirection::Given => "r.reviewer_id",
        };
        let total = self
            .count(&format!("SELECT COUNT(*) FROM reviews r WHERE {} = ?", column), user_id)
            .await?;

        let query = format!(
            "SELECT {} FROM reviews r WHERE {} = ? ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?",
            REVIEW_COLUMNS, column
        );
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list user reviews"))?;

        let reviews = rows.iter().map(Self::row_to_review).collect::<Result<Vec<_>, _>>()?;
        Ok(page(reviews, pagination, total))
    }

    async fn received_by(&self, user_id: Uuid) -> Result<Vec<ReceivedReview>, DomainError> {
        let query = format!(
            "SELECT {}, CASE WHEN {} THEN 'provider' ELSE 'student' END AS reviewee_role \
             FROM reviews r JOIN bookings b ON b.id = r.booking_id WHERE r.reviewee_id = ?",
            REVIEW_COLUMNS, ABOUT_PROVIDER
        );
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to load received reviews"))?;

        rows.iter()
            .map(|row| {
                Ok(ReceivedReview {
                    review: Self::row_to_review(row)?,
                    reviewee_role: enum_col(row, "reviewee_role")?,
                })
            })
            .collect()
    }

    async fn service_ratings(&self, service_id: Uuid) -> Result<Vec<u8>, DomainError> {
        let query = format!(
            "SELECT r.rating FROM reviews r JOIN bookings b ON b.id = r.booking_id WHERE b.service_id = ? AND {}",
            ABOUT_PROVIDER
        );
        let rows = sqlx::query(&query)
            .bind(service_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to load service ratings"))?;
        Self::ratings(&rows)
    }

    async fn user_ratings(&self, user_id: Uuid, role: UserRole) -> Result<Vec<u8>, DomainError> {
        let side = match role {
            UserRole::Provider => "b.provider_id",
            UserRole::Student => "b.student_id",
        };
        let query = format!(
            "SELECT r.rating FROM reviews r JOIN bookings b ON b.id = r.booking_id \
             WHERE r.reviewee_id = ? AND r.reviewee_id = {}",
            side
        );
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to load user ratings"))?;
        Self::ratings(&rows)
    }
}
