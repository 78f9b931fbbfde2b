//! Booking repository trait.
//!
//! Every write here is a read-modify-write on one booking row and must run
//! atomically: implementations lock the row (or the whole store) for the
//! duration so concurrent transitions cannot interleave.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::booking::{Booking, BookingChanges, BookingStatus};
use crate::domain::value_objects::query::{BookingFilter, CalendarQuery};
use crate::errors::DomainError;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking after checking, under the same lock, that no active
    /// booking of the service lies within the conflict window
    async fn create(&self, booking: Booking) -> Result<Booking, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, DomainError>;

    /// Bookings where `user_id` is the student or the provider
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &BookingFilter,
        now: DateTime<Utc>,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Booking>, DomainError>;

    /// Apply a status change to the freshly locked row
    ///
    /// # Returns
    /// * `Ok((booking, changed))` - the stored booking and whether its status moved
    /// * `Err(DomainError::Transition)` - the edge is not permitted; nothing is written
    async fn transition(
        &self,
        id: Uuid,
        next: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(Booking, bool), DomainError>;

    /// Edit date or locations of a non-terminal booking, re-checking the slot
    /// when the date moves
    async fn update_details(
        &self,
        id: Uuid,
        changes: BookingChanges,
        now: DateTime<Utc>,
    ) -> Result<Booking, DomainError>;

    /// Bookings matching a calendar request, earliest first
    async fn calendar(&self, query: &CalendarQuery) -> Result<Vec<Booking>, DomainError>;

    /// Ids of completed bookings `user_id` took part in
    async fn completed_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, DomainError>;
}
