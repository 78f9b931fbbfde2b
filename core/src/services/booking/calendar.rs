use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::booking::{Booking, BookingStatus, CONFLICT_WINDOW_HOURS};

/// Earliest hourly start time offered, UTC
pub const FIRST_SLOT_HOUR: u32 = 8;
/// Latest hourly start time offered, UTC
pub const LAST_SLOT_HOUR: u32 = 18;

/// One booking as shown on the calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub student_email: String,
    pub provider_email: String,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub bookings: Vec<CalendarEntry>,
    /// Free start times as `HH:MM`
    pub available_slots: Vec<String>,
    pub is_fully_booked: bool,
}

impl CalendarDay {
    /// Lay out `date` from the entries falling on it
    pub(crate) fn build(date: NaiveDate, bookings: Vec<CalendarEntry>) -> Self {
        let available_slots: Vec<String> = (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
            .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
            .filter(|time| {
                let start = date.and_time(*time).and_utc();
                bookings.iter().all(|b| !within_window(b.booking_date, start))
            })
            .map(|time| time.format("%H:%M").to_string())
            .collect();

        Self {
            date,
            is_fully_booked: available_slots.is_empty(),
            bookings,
            available_slots,
        }
    }
}

fn within_window(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).abs() < Duration::hours(CONFLICT_WINDOW_HOURS)
}

impl CalendarEntry {
    pub(crate) fn new(booking: &Booking, service_name: &str, student_email: &str, provider_email: &str) -> Self {
        Self {
            id: booking.id,
            service_id: booking.service_id,
            service_name: service_name.to_string(),
            student_email: student_email.to_string(),
            provider_email: provider_email.to_string(),
            booking_date: booking.booking_date,
            status: booking.status,
            total_price: booking.total_price,
        }
    }
}
