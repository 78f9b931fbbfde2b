use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::booking::{Booking, BookingChanges, BookingStatus, NewBooking};
use crate::domain::entities::moving_service::MovingService;
use crate::domain::entities::user::{User, UserRole};
use crate::domain::value_objects::query::{BookingFilter, CalendarQuery};
use crate::errors::DomainError;
use crate::repositories::{BookingRepository, MovingServiceRepository, UserRepository};

use super::calendar::{CalendarDay, CalendarEntry};

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    services: Arc<dyn MovingServiceRepository>,
    users: Arc<dyn UserRepository>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        services: Arc<dyn MovingServiceRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            bookings,
            services,
            users,
        }
    }

    /// Book a service for `actor`, who must be a student.
    ///
    /// The provider is always the service's owner.
    pub async fn create(&self, actor: &User, input: NewBooking) -> Result<Booking, DomainError> {
        let service = self
            .services
            .find_by_id(input.service_id)
            .await?
            .ok_or_else(|| DomainError::invalid("service_id", "Moving service not found.", "does_not_exist"))?;
        let provider = self.load_user(service.provider_id, "Provider").await?;

        let booking = Booking::new(actor, &provider, &service, input, Utc::now())?;
        let booking = self.bookings.create(booking).await?;
        info!(
            booking_id = %booking.id,
            service_id = %booking.service_id,
            student_id = %booking.student_id,
            "Booking created"
        );
        Ok(booking)
    }

    /// A booking visible to its student, its provider or staff
    pub async fn get(&self, actor: &User, id: Uuid) -> Result<Booking, DomainError> {
        let booking = self.find(id).await?;
        ensure_party_or_staff(actor, &booking)?;
        Ok(booking)
    }

    pub async fn list_own(
        &self,
        actor: &User,
        filter: &BookingFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Booking>, DomainError> {
        self.bookings.list_for_user(actor.id, filter, Utc::now(), pagination).await
    }

    /// Move a booking to `next` on behalf of `actor`.
    ///
    /// Confirming and completing belong to the provider, cancelling to
    /// either party; staff may do all three.
    pub async fn update_status(&self, actor: &User, id: Uuid, next: BookingStatus) -> Result<Booking, DomainError> {
        let booking = self.find(id).await?;
        ensure_party_or_staff(actor, &booking)?;

        let allowed = actor.is_staff
            || match next {
                BookingStatus::Confirmed | BookingStatus::Completed => actor.id == booking.provider_id,
                BookingStatus::Pending | BookingStatus::Cancelled => booking.is_party(actor.id),
            };
        if !allowed {
            return Err(DomainError::permission_denied(format!(
                "Only the provider can mark a booking as {}.",
                next
            )));
        }

        let (booking, changed) = self.bookings.transition(id, next, Utc::now()).await?;
        if changed {
            info!(booking_id = %booking.id, status = %booking.status, actor_id = %actor.id, "Booking status changed");
        } else {
            debug!(booking_id = %booking.id, status = %booking.status, "Booking status unchanged");
        }
        Ok(booking)
    }

    /// Change date or locations of a booking that is still open
    pub async fn update_details(&self, actor: &User, id: Uuid, changes: BookingChanges) -> Result<Booking, DomainError> {
        let booking = self.find(id).await?;
        ensure_party_or_staff(actor, &booking)?;
        self.bookings.update_details(id, changes, Utc::now()).await
    }

    /// Day-by-day view of bookings and free start times
    pub async fn calendar(&self, query: &CalendarQuery) -> Result<Vec<CalendarDay>, DomainError> {
        if let Some(provider_id) = query.provider_id {
            match self.users.find_by_id(provider_id).await? {
                Some(user) if user.role == UserRole::Provider => {}
                _ => return Err(DomainError::invalid("provider", "Provider not found.", "does_not_exist")),
            }
        }
        if let Some(service_id) = query.service_id {
            if self.services.find_by_id(service_id).await?.is_none() {
                return Err(DomainError::invalid("service", "Moving service not found.", "does_not_exist"));
            }
        }

        let bookings = self.bookings.calendar(query).await?;
        let mut services: HashMap<Uuid, MovingService> = HashMap::new();
        let mut emails: HashMap<Uuid, String> = HashMap::new();
        let mut by_day: HashMap<chrono::NaiveDate, Vec<CalendarEntry>> = HashMap::new();

        for booking in &bookings {
            if !services.contains_key(&booking.service_id) {
                let service = self
                    .services
                    .find_by_id(booking.service_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Moving service"))?;
                services.insert(service.id, service);
            }
            for user_id in [booking.student_id, booking.provider_id] {
                if !emails.contains_key(&user_id) {
                    let user = self.load_user(user_id, "User").await?;
                    emails.insert(user.id, user.email);
                }
            }

            let service_name = services
                .get(&booking.service_id)
                .map(|s| s.service_name.as_str())
                .unwrap_or_default();
            let student_email = emails.get(&booking.student_id).map(String::as_str).unwrap_or_default();
            let provider_email = emails.get(&booking.provider_id).map(String::as_str).unwrap_or_default();
            by_day
                .entry(booking.booking_date.date_naive())
                .or_default()
                .push(CalendarEntry::new(booking, service_name, student_email, provider_email));
        }

        Ok(query
            .days()
            .map(|day| CalendarDay::build(day, by_day.remove(&day).unwrap_or_default()))
            .collect())
    }

    async fn find(&self, id: Uuid) -> Result<Booking, DomainError> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking"))
    }

    async fn load_user(&self, id: Uuid, resource: &str) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(resource))
    }
}

fn ensure_party_or_staff(actor: &User, booking: &Booking) -> Result<(), DomainError> {
    if booking.is_party(actor.id) || actor.is_staff {
        Ok(())
    } else {
        Err(DomainError::permission_denied(
            "You do not have permission to access this booking.",
        ))
    }
}
