use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::booking::{Booking, BookingStatus};
use crate::domain::entities::review::{ReceivedReview, Review};
use crate::domain::entities::user::UserRole;
use crate::domain::value_objects::money::average_rating;
use crate::errors::DomainError;
use crate::repositories::memory::{InMemoryStore, Tables};

use super::trait_::{duplicate_review_error, ReviewDirection, ReviewRepository};

/// Recompute the reviewee's per-role average and, for reviews of the
/// provider, the service aggregate, from whatever reviews remain
fn refresh_aggregates(tables: &mut Tables, review: &Review, booking: &Booking) {
    let now = Utc::now();
    let role = if review.is_about_provider(booking) {
        UserRole::Provider
    } else {
        UserRole::Student
    };
    let user_average = average_rating(tables.user_ratings(review.reviewee_id, role)).unwrap_or(Decimal::ZERO);
    if let Some(reviewee) = tables.users.get_mut(&review.reviewee_id) {
        match role {
            UserRole::Provider => reviewee.avg_rating_as_provider = user_average,
            UserRole::Student => reviewee.avg_rating_as_student = user_average,
        }
        reviewee.updated_at = now;
    }

    if role == UserRole::Provider {
        let ratings = tables.service_ratings(booking.service_id);
        let total = ratings.len() as u32;
        let service_average = average_rating(ratings).unwrap_or(Decimal::ZERO);
        if let Some(service) = tables.services.get_mut(&booking.service_id) {
            service.rating_average = service_average;
            service.total_reviews = total;
            service.updated_at = now;
        }
    }
}

fn newest_first(mut reviews: Vec<Review>) -> Vec<Review> {
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    reviews
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn create(&self, review: Review) -> Result<Review, DomainError> {
        let mut tables = self.write().await;
        let booking = tables.booking(review.booking_id)?.clone();
        tables.user(review.reviewer_id)?;
        tables.user(review.reviewee_id)?;

        if booking.status != BookingStatus::Completed {
            return Err(DomainError::invalid(
                "booking",
                "You can only review completed bookings.",
                "booking_not_completed",
            ));
        }
        if tables.reviews.values().any(|r| r.booking_id == review.booking_id) {
            return Err(duplicate_review_error());
        }
        tables.reviews.insert(review.id, review.clone());
        refresh_aggregates(&mut tables, &review, &booking);
        Ok(review)
    }

    async fn update(&self, review: Review) -> Result<Review, DomainError> {
        let mut tables = self.write().await;
        let mut stored = tables
            .reviews
            .get(&review.id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Review"))?;
        let booking = tables.booking(stored.booking_id)?.clone();
        stored.rating = review.rating;
        stored.comment = review.comment;
        stored.updated_at = review.updated_at;
        tables.reviews.insert(stored.id, stored.clone());
        refresh_aggregates(&mut tables, &stored, &booking);
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut tables = self.write().await;
        let review = tables.reviews.get(&id).cloned().ok_or_else(|| DomainError::not_found("Review"))?;
        let booking = tables.booking(review.booking_id)?.clone();
        tables.reviews.remove(&id);
        refresh_aggregates(&mut tables, &review, &booking);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, DomainError> {
        Ok(self.read().await.reviews.get(&id).cloned())
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Review>, DomainError> {
        let tables = self.read().await;
        Ok(tables.reviews.values().find(|r| r.booking_id == booking_id).cloned())
    }

    async fn list_for_service(
        &self,
        service_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Review>, DomainError> {
        let tables = self.read().await;
        let reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| {
                tables
                    .bookings
                    .get(&r.booking_id)
                    .map_or(false, |b| b.service_id == service_id && r.is_about_provider(b))
            })
            .cloned()
            .collect();
        Ok(pagination.apply(newest_first(reviews)))
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        direction: ReviewDirection,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Review>, DomainError> {
        let tables = self.read().await;
        let reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| match direction {
                ReviewDirection::Received => r.reviewee_id == user_id,
                ReviewDirection::Given => r.reviewer_id == user_id,
            })
            .cloned()
            .collect();
        Ok(pagination.apply(newest_first(reviews)))
    }

    async fn received_by(&self, user_id: Uuid) -> Result<Vec<ReceivedReview>, DomainError> {
        let tables = self.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|r| r.reviewee_id == user_id)
            .filter_map(|r| {
                tables.reviewee_role(r).map(|reviewee_role| ReceivedReview {
                    review: r.clone(),
                    reviewee_role,
                })
            })
            .collect())
    }

    async fn service_ratings(&self, service_id: Uuid) -> Result<Vec<u8>, DomainError> {
        Ok(self.read().await.service_ratings(service_id))
    }

    async fn user_ratings(&self, user_id: Uuid, role: UserRole) -> Result<Vec<u8>, DomainError> {
        Ok(self.read().await.user_ratings(user_id, role))
    }
}
