use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::booking::{slot_conflict_error, Booking, BookingChanges, BookingStatus};
use crate::domain::value_objects::query::{BookingFilter, CalendarQuery, SortDirection};
use crate::errors::DomainError;
use crate::repositories::memory::{InMemoryStore, Tables};

use super::trait_::BookingRepository;

fn ensure_party_roles(tables: &Tables, booking: &Booking) -> Result<(), DomainError> {
    let student = tables.user(booking.student_id)?;
    let provider = tables.user(booking.provider_id)?;
    booking.ensure_party_roles(student.role, provider.role)
}

fn slot_taken(tables: &Tables, exclude: Uuid, service_id: Uuid, date: DateTime<Utc>) -> bool {
    tables
        .bookings
        .values()
        .any(|b| b.id != exclude && b.conflicts_with(service_id, date))
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create(&self, booking: Booking) -> Result<Booking, DomainError> {
        let mut tables = self.write().await;
        tables.user(booking.student_id)?;
        tables.user(booking.provider_id)?;
        tables.service(booking.service_id)?;

        if slot_taken(&tables, booking.id, booking.service_id, booking.booking_date) {
            return Err(slot_conflict_error());
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, DomainError> {
        Ok(self.read().await.bookings.get(&id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &BookingFilter,
        now: DateTime<Utc>,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Booking>, DomainError> {
        let tables = self.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.is_party(user_id) && filter.matches(b.status, b.booking_date, now))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| {
            let ord = a.booking_date.cmp(&b.booking_date).then(a.id.cmp(&b.id));
            match filter.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        Ok(pagination.apply(bookings))
    }

    async fn transition(
        &self,
        id: Uuid,
        next: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(Booking, bool), DomainError> {
        let mut tables = self.write().await;
        let mut booking = tables.booking(id)?.clone();
        ensure_party_roles(&tables, &booking)?;
        let changed = booking.transition_to(next, now)?;
        if changed {
            tables.bookings.insert(id, booking.clone());
        }
        Ok((booking, changed))
    }

    async fn update_details(
        &self,
        id: Uuid,
        changes: BookingChanges,
        now: DateTime<Utc>,
    ) -> Result<Booking, DomainError> {
        let mut tables = self.write().await;
        let mut updated = tables.booking(id)?.clone();
        ensure_party_roles(&tables, &updated)?;
        let moves = changes.booking_date.map_or(false, |d| d != updated.booking_date);
        updated.apply_changes(changes, now)?;

        if moves && slot_taken(&tables, id, updated.service_id, updated.booking_date) {
            return Err(slot_conflict_error());
        }
        tables.bookings.insert(id, updated.clone());
        Ok(updated)
    }

    async fn calendar(&self, query: &CalendarQuery) -> Result<Vec<Booking>, DomainError> {
        let tables = self.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.booking_date.cmp(&b.booking_date).then(a.id.cmp(&b.id)));
        Ok(bookings)
    }

    async fn completed_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, DomainError> {
        let tables = self.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.is_party(user_id) && b.status == BookingStatus::Completed)
            .map(|b| b.id)
            .collect())
    }
}
