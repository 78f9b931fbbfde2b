//! Review repository trait.

use async_trait::async_trait;
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::review::{ReceivedReview, Review};
use crate::domain::entities::user::UserRole;
use crate::errors::DomainError;

/// Which side of a user's reviews to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDirection {
    Received,
    Given,
}

impl ReviewDirection {
    /// `given` selects written reviews; anything else means received
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("given") => ReviewDirection::Given,
            _ => ReviewDirection::Received,
        }
    }
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Store a review and refresh the aggregates it feeds, in one unit:
    /// the reviewee's average for the role they held, and for reviews of a
    /// provider the service's average and review count.
    ///
    /// # Returns
    /// * `Err(DomainError::Conflict)` - the booking already has a review
    async fn create(&self, review: Review) -> Result<Review, DomainError>;

    /// Persist an edited rating or comment and refresh the same aggregates
    /// as `create`, in one unit.
    ///
    /// # Returns
    /// * `Err(DomainError::NotFound)` - the review was deleted meanwhile
    async fn update(&self, review: Review) -> Result<Review, DomainError>;

    /// Remove a review and refresh the aggregates it fed, in one unit.
    /// Averages with nothing left to average drop back to zero.
    ///
    /// # Returns
    /// * `Err(DomainError::NotFound)` - no such review
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, DomainError>;

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Review>, DomainError>;

    /// Reviews of the provider on bookings of `service_id`, newest first
    async fn list_for_service(
        &self,
        service_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Review>, DomainError>;

    /// Reviews a user received or wrote, newest first
    async fn list_by_user(
        &self,
        user_id: Uuid,
        direction: ReviewDirection,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Review>, DomainError>;

    /// Every review `user_id` received, tagged with the role they held
    async fn received_by(&self, user_id: Uuid) -> Result<Vec<ReceivedReview>, DomainError>;

    /// Ratings counted towards the service aggregate
    async fn service_ratings(&self, service_id: Uuid) -> Result<Vec<u8>, DomainError>;

    /// Ratings `user_id` received while holding `role`
    async fn user_ratings(&self, user_id: Uuid, role: UserRole) -> Result<Vec<u8>, DomainError>;
}

pub fn duplicate_review_error() -> DomainError {
    DomainError::Conflict {
        message: "A review already exists for this booking.".to_string(),
    }
}
