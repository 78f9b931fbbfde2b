use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use cm_core::domain::entities::booking::{BookingChanges, BookingStatus, NewBooking};
use cm_shared::validation::ValidationErrors;

use super::parse_choice;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub service_id: Uuid,
    pub booking_date: DateTime<Utc>,
    #[validate(length(min = 1, max = 300))]
    pub pickup_location: String,
    #[validate(length(min = 1, max = 300))]
    pub dropoff_location: String,
    /// Defaults to the service's base price
    pub total_price: Option<Decimal>,
}

impl From<CreateBookingRequest> for NewBooking {
    fn from(request: CreateBookingRequest) -> Self {
        NewBooking {
            service_id: request.service_id,
            booking_date: request.booking_date,
            pickup_location: request.pickup_location,
            dropoff_location: request.dropoff_location,
            total_price: request.total_price,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBookingRequest {
    pub booking_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 300))]
    pub pickup_location: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub dropoff_location: Option<String>,
}

impl From<UpdateBookingRequest> for BookingChanges {
    fn from(request: UpdateBookingRequest) -> Self {
        BookingChanges {
            booking_date: request.booking_date,
            pickup_location: request.pickup_location,
            dropoff_location: request.dropoff_location,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

impl StatusUpdateRequest {
    pub fn parse(&self) -> Result<BookingStatus, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match parse_choice("status", &self.status, &mut errors) {
            Some(status) => Ok(status),
            None => Err(errors),
        }
    }
}
