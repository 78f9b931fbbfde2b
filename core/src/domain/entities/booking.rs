//! Bookings of a moving service by a student, and their status machine.
//!
//! ```text
//! pending ──► confirmed ──► completed
//!    │            │
//!    └────────────┴──► cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal: nothing about a booking in
//! either state may change afterwards.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cm_shared::validation::{validators, ValidationErrors};

use crate::domain::entities::moving_service::MovingService;
use crate::domain::entities::user::{check_role, ensure_role, User, UserRole};
use crate::domain::value_objects::money::validate_price;
use crate::errors::{DomainError, TransitionError};

/// Bookings must be made at least this far ahead
pub const MIN_ADVANCE_HOURS: i64 = 1;

/// Two active bookings of one service must be this far apart
pub const CONFLICT_WINDOW_HOURS: i64 = 2;

pub const LOCATION_MAX_LEN: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Whether a booking in this status still holds its time slot
    pub fn occupies_slot(&self) -> bool {
        !self.is_terminal()
    }

    /// Check the edge `self -> next` against the graph.
    ///
    /// Re-asserting a non-terminal status is accepted as a no-op.
    pub fn can_transition_to(&self, next: BookingStatus) -> Result<(), TransitionError> {
        use BookingStatus::*;

        let reject = |reason: &str| Err(TransitionError::new("booking", self, next, reason));

        match (self, next) {
            (Completed, _) => reject("Cannot modify a completed booking."),
            (Cancelled, _) => reject("Cannot modify a cancelled booking."),
            (Pending, Completed) => reject("Must confirm first."),
            (Confirmed, Pending) => reject("A confirmed booking cannot return to pending."),
            (Pending, Pending)
            | (Confirmed, Confirmed)
            | (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, Cancelled)
            | (Confirmed, Completed) => Ok(()),
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("\"{}\" is not a valid choice.", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub student_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub booking_date: DateTime<Utc>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub status: BookingStatus,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub service_id: Uuid,
    pub booking_date: DateTime<Utc>,
    pub pickup_location: String,
    pub dropoff_location: String,
    /// Defaults to the service's base price
    pub total_price: Option<Decimal>,
}

/// Editable booking fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingChanges {
    pub booking_date: Option<DateTime<Utc>>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self.booking_date.is_none() && self.pickup_location.is_none() && self.dropoff_location.is_none()
    }
}

impl Booking {
    /// Build a pending booking after the role and relationship checks.
    ///
    /// `provider` must be the service's owner; it is passed in rather than
    /// looked up so its role can be checked like the student's.
    pub fn new(
        student: &User,
        provider: &User,
        service: &MovingService,
        input: NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        ensure_role(student, UserRole::Student, "student")?;
        ensure_role(provider, UserRole::Provider, "provider")?;

        if service.provider_id != provider.id {
            return Err(DomainError::invalid(
                "provider",
                "Provider must be the owner of the booked service.",
                "provider_mismatch",
            ));
        }
        if service.is_owned_by(student.id) {
            return Err(DomainError::invalid("service", "You cannot book your own service.", "own_service"));
        }
        if !service.availability_status {
            return Err(DomainError::invalid(
                "service",
                "This service is currently unavailable for booking.",
                "service_unavailable",
            ));
        }

        let booking = Self {
            id: Uuid::new_v4(),
            student_id: student.id,
            provider_id: provider.id,
            service_id: service.id,
            booking_date: input.booking_date,
            pickup_location: input.pickup_location.trim().to_string(),
            dropoff_location: input.dropoff_location.trim().to_string(),
            status: BookingStatus::Pending,
            total_price: input.total_price.unwrap_or(service.base_price),
            created_at: now,
            updated_at: now,
        };

        let mut errors = booking.field_errors();
        if let Err(e) = check_advance_notice(booking.booking_date, now) {
            errors.add(e);
        }
        errors.into_result()?;
        Ok(booking)
    }

    /// Role checks re-run before every save, against the parties' current
    /// roles
    pub fn ensure_party_roles(&self, student_role: UserRole, provider_role: UserRole) -> Result<(), DomainError> {
        check_role(student_role, UserRole::Student, "student")?;
        check_role(provider_role, UserRole::Provider, "provider")
    }

    fn field_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check(validators::required_text("pickup_location", &self.pickup_location, LOCATION_MAX_LEN));
        errors.check(validators::required_text("dropoff_location", &self.dropoff_location, LOCATION_MAX_LEN));
        errors.check(validate_price("total_price", self.total_price));
        errors
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.field_errors().into_result()
    }

    /// Move to `next`. Returns whether the status actually changed.
    ///
    /// Completion is refused while the scheduled time is still ahead.
    pub fn transition_to(&mut self, next: BookingStatus, now: DateTime<Utc>) -> Result<bool, TransitionError> {
        self.status.can_transition_to(next)?;
        if next == BookingStatus::Completed && self.booking_date > now {
            return Err(TransitionError::new(
                "booking",
                self.status,
                next,
                "Cannot complete a booking before its scheduled date.",
            ));
        }
        if next == self.status {
            return Ok(false);
        }
        self.status = next;
        self.updated_at = now;
        Ok(true)
    }

    /// Edit the non-status fields; refused outright once terminal
    pub fn apply_changes(&mut self, changes: BookingChanges, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::BookingLocked { status: self.status });
        }

        let mut updated = self.clone();
        if let Some(pickup) = changes.pickup_location {
            updated.pickup_location = pickup.trim().to_string();
        }
        if let Some(dropoff) = changes.dropoff_location {
            updated.dropoff_location = dropoff.trim().to_string();
        }
        let mut errors = updated.field_errors();
        if let Some(date) = changes.booking_date {
            updated.booking_date = date;
            if let Err(e) = check_advance_notice(date, now) {
                errors.add(e);
            }
        }
        errors.into_result()?;

        updated.updated_at = now;
        *self = updated;
        Ok(())
    }

    /// Whether this booking blocks a new booking of the same service at `date`
    pub fn conflicts_with(&self, service_id: Uuid, date: DateTime<Utc>) -> bool {
        self.service_id == service_id
            && self.status.occupies_slot()
            && (self.booking_date - date).abs() < Duration::hours(CONFLICT_WINDOW_HOURS)
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.student_id == user_id || self.provider_id == user_id
    }

    /// The other side of the booking from `user_id`
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.student_id {
            Some(self.provider_id)
        } else if user_id == self.provider_id {
            Some(self.student_id)
        } else {
            None
        }
    }
}

fn check_advance_notice(
    date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), cm_shared::validation::ValidationError> {
    if date < now + Duration::hours(MIN_ADVANCE_HOURS) {
        return Err(cm_shared::validation::ValidationError::new(
            "booking_date",
            "Booking must be made at least 1 hour in advance.",
            "too_soon",
        ));
    }
    Ok(())
}

/// The error for a slot already taken
pub fn slot_conflict_error() -> DomainError {
    DomainError::invalid(
        "booking_date",
        "This time slot is already booked for this service (conflict within 2 hours).",
        "slot_conflict",
    )
}
