//! Booking workflow: creation with slot checks, status changes by the
//! right party, detail edits and the public availability calendar

mod calendar;
mod service;

#[cfg(test)]
mod tests;

pub use calendar::{CalendarDay, CalendarEntry, FIRST_SLOT_HOUR, LAST_SLOT_HOUR};
pub use service::BookingService;
