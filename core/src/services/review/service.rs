use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::review::{RatingStats, Review, ReviewChanges, UserRatingSummary};
use crate::domain::entities::user::User;
use crate::errors::DomainError;
use crate::repositories::{
    BookingRepository, MovingServiceRepository, ReviewDirection, ReviewRepository, UserRepository,
};

/// Rating statistics of one listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRatingSummary {
    pub service_id: Uuid,
    pub service_name: String,
    #[serde(flatten)]
    pub stats: RatingStats,
}

pub struct ReviewService {
    pub(super) reviews: Arc<dyn ReviewRepository>,
    pub(super) bookings: Arc<dyn BookingRepository>,
    pub(super) services: Arc<dyn MovingServiceRepository>,
    pub(super) users: Arc<dyn UserRepository>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        bookings: Arc<dyn BookingRepository>,
        services: Arc<dyn MovingServiceRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            reviews,
            bookings,
            services,
            users,
        }
    }

    /// Review the other party of a completed booking `actor` took part in
    pub async fn create(&self, actor: &User, booking_id: Uuid, rating: u8, comment: &str) -> Result<Review, DomainError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::invalid("booking", "Booking not found.", "does_not_exist"))?;
        let review = Review::new(&booking, actor.id, rating, comment)?;

        let review = self.reviews.create(review).await?;
        info!(
            review_id = %review.id,
            booking_id = %booking_id,
            reviewee_id = %review.reviewee_id,
            rating = review.rating,
            "Review created"
        );
        Ok(review)
    }

    /// Edit the rating or comment of a review `actor` wrote
    pub async fn update(&self, actor: &User, review_id: Uuid, changes: ReviewChanges) -> Result<Review, DomainError> {
        let mut review = self.own_review(actor, review_id, "You can only edit your own reviews.").await?;
        if changes.is_empty() {
            return Err(DomainError::invalid(
                "non_field_errors",
                "Provide a rating or a comment to update.",
                "empty_update",
            ));
        }
        let previous_rating = review.rating;
        review.apply_changes(changes)?;

        let review = self.reviews.update(review).await?;
        info!(
            review_id = %review.id,
            previous_rating,
            rating = review.rating,
            "Review updated"
        );
        Ok(review)
    }

    /// Delete a review `actor` wrote; the aggregates it fed are recomputed
    pub async fn delete(&self, actor: &User, review_id: Uuid) -> Result<(), DomainError> {
        let review = self.own_review(actor, review_id, "You can only delete your own reviews.").await?;
        self.reviews.delete(review.id).await?;
        info!(review_id = %review.id, reviewee_id = %review.reviewee_id, "Review deleted");
        Ok(())
    }

    async fn own_review(&self, actor: &User, review_id: Uuid, denied: &str) -> Result<Review, DomainError> {
        let review = self
            .reviews
            .find_by_id(review_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Review"))?;
        if review.reviewer_id != actor.id {
            return Err(DomainError::permission_denied(denied));
        }
        Ok(review)
    }

    pub async fn list_for_service(
        &self,
        service_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Review>, DomainError> {
        self.find_service_name(service_id).await?;
        self.reviews.list_for_service(service_id, pagination).await
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        direction: ReviewDirection,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Review>, DomainError> {
        self.find_user(user_id).await?;
        self.reviews.list_by_user(user_id, direction, pagination).await
    }

    pub async fn service_summary(&self, service_id: Uuid) -> Result<ServiceRatingSummary, DomainError> {
        let service_name = self.find_service_name(service_id).await?;
        let ratings = self.reviews.service_ratings(service_id).await?;
        Ok(ServiceRatingSummary {
            service_id,
            service_name,
            stats: RatingStats::from_ratings(&ratings),
        })
    }

    pub async fn user_summary(&self, user_id: Uuid) -> Result<UserRatingSummary, DomainError> {
        let user = self.find_user(user_id).await?;
        let received = self.reviews.received_by(user_id).await?;
        let completed = self.bookings.completed_for_user(user_id).await?;
        Ok(UserRatingSummary::build(user.id, user.role, &received, &completed))
    }

    async fn find_service_name(&self, id: Uuid) -> Result<String, DomainError> {
        self.services
            .find_by_id(id)
            .await?
            .map(|s| s.service_name)
            .ok_or_else(|| DomainError::not_found("Moving service"))
    }

    async fn find_user(&self, id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))
    }
}
