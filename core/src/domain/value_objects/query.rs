//! Listing filters and orderings understood by the repositories.
//!
//! Parsing from query strings is lenient: values that do not parse are
//! dropped rather than rejected.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use cm_shared::validation::ValidationErrors;

use crate::domain::entities::booking::{Booking, BookingStatus};
use crate::domain::entities::furniture::{ItemCategory, ItemCondition};

fn lenient<T: FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn flag(value: Option<&str>) -> Option<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "true" || v == "1" => Some(true),
        Some(v) if v == "false" || v == "0" => Some(false),
        _ => None,
    }
}

/// Moving-service catalogue filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    pub available: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_rating: Option<Decimal>,
    /// Case-insensitive match on the provider's university
    pub university: Option<String>,
}

impl ServiceFilter {
    pub fn from_query(
        available: Option<&str>,
        min_price: Option<&str>,
        max_price: Option<&str>,
        min_rating: Option<&str>,
        university: Option<&str>,
    ) -> Self {
        Self {
            available: flag(available),
            min_price: lenient(min_price),
            max_price: lenient(max_price),
            min_rating: lenient(min_rating),
            university: university
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceSortKey {
    Price,
    Rating,
    Date,
}

/// Catalogue ordering; the default is best rated first, then cheapest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOrdering {
    pub keys: Vec<(ServiceSortKey, SortDirection)>,
}

impl Default for ServiceOrdering {
    fn default() -> Self {
        Self {
            keys: vec![
                (ServiceSortKey::Rating, SortDirection::Descending),
                (ServiceSortKey::Price, SortDirection::Ascending),
            ],
        }
    }
}

impl ServiceOrdering {
    /// `price`, `-price`, `rating`, `-rating`, `date`, `-date`; anything else
    /// falls back to the default
    pub fn parse(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim) else {
            return Self::default();
        };
        let (direction, name) = match raw.strip_prefix('-') {
            Some(rest) => (SortDirection::Descending, rest),
            None => (SortDirection::Ascending, raw),
        };
        let key = match name {
            "price" => ServiceSortKey::Price,
            "rating" => ServiceSortKey::Rating,
            "date" => ServiceSortKey::Date,
            _ => return Self::default(),
        };
        Self {
            keys: vec![(key, direction)],
        }
    }
}

/// Furniture browsing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FurnitureFilter {
    pub category: Option<ItemCategory>,
    pub condition: Option<ItemCondition>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Substring of title or description, case-insensitive
    pub search: Option<String>,
    pub include_sold: bool,
    pub seller_id: Option<uuid::Uuid>,
}

impl FurnitureFilter {
    pub fn from_query(
        category: Option<&str>,
        condition: Option<&str>,
        min_price: Option<&str>,
        max_price: Option<&str>,
        search: Option<&str>,
        include_sold: Option<&str>,
    ) -> Self {
        Self {
            category: lenient(category),
            condition: lenient(condition),
            min_price: lenient(min_price),
            max_price: lenient(max_price),
            search: search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            include_sold: flag(include_sold).unwrap_or(false),
            seller_id: None,
        }
    }
}

/// Filter over a user's own bookings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    /// Inclusive calendar-day bounds on `booking_date`
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// `Some(true)`: still ahead and not terminal; `Some(false)`: in the past
    pub upcoming: Option<bool>,
    pub direction: SortDirection,
}

impl Default for BookingFilter {
    fn default() -> Self {
        Self {
            status: None,
            start_date: None,
            end_date: None,
            upcoming: None,
            direction: SortDirection::Descending,
        }
    }
}

impl BookingFilter {
    pub fn from_query(
        status: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        upcoming: Option<&str>,
        past: Option<&str>,
        ordering: Option<&str>,
    ) -> Self {
        let upcoming = match (flag(upcoming), flag(past)) {
            (Some(true), _) => Some(true),
            (_, Some(true)) => Some(false),
            _ => None,
        };
        Self {
            status: lenient(status),
            start_date: start_date.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
            end_date: end_date.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
            upcoming,
            direction: match ordering.map(str::trim) {
                Some("booking_date") => SortDirection::Ascending,
                _ => SortDirection::Descending,
            },
        }
    }

    /// In-process evaluation, shared by the memory store and tests
    pub fn matches(&self, status: BookingStatus, booking_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.status.map_or(false, |s| s != status) {
            return false;
        }
        let day = booking_date.date_naive();
        if self.start_date.map_or(false, |start| day < start) {
            return false;
        }
        if self.end_date.map_or(false, |end| day > end) {
            return false;
        }
        match self.upcoming {
            Some(true) => booking_date >= now && !status.is_terminal(),
            Some(false) => booking_date < now,
            None => true,
        }
    }
}

/// Longest span one calendar request may cover, in days
pub const CALENDAR_MAX_DAYS: i64 = 90;

/// Booking calendar request. Unlike the listing filters, bad values here are
/// reported instead of ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub provider_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub statuses: Vec<BookingStatus>,
}

impl CalendarQuery {
    pub fn parse(
        start_date: Option<&str>,
        end_date: Option<&str>,
        provider: Option<&str>,
        service: Option<&str>,
        status: Option<&str>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut date = |field: &str, value: Option<&str>| -> Option<NaiveDate> {
            match value.map(str::trim).filter(|v| !v.is_empty()) {
                None => {
                    errors.add_error(field, "This query parameter is required.", "required");
                    None
                }
                Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
                    .map_err(|_| {
                        errors.add_error(field, "Date has wrong format. Use YYYY-MM-DD.", "invalid_date")
                    })
                    .ok(),
            }
        };
        let start = date("start_date", start_date);
        let end = date("end_date", end_date);

        let mut id = |field: &str, value: Option<&str>| -> Option<Uuid> {
            let value = value.map(str::trim).filter(|v| !v.is_empty())?;
            Uuid::parse_str(value)
                .map_err(|_| errors.add_error(field, "Must be a valid UUID.", "invalid"))
                .ok()
        };
        let provider_id = id("provider", provider);
        let service_id = id("service", service);

        let mut statuses = Vec::new();
        for part in status.unwrap_or("").split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.parse::<BookingStatus>() {
                Ok(s) if !statuses.contains(&s) => statuses.push(s),
                Ok(_) => {}
                Err(_) => errors.add_error(
                    "status",
                    format!("\"{}\" is not a valid choice.", part),
                    "invalid_choice",
                ),
            }
        }
        if statuses.is_empty() {
            statuses = vec![BookingStatus::Pending, BookingStatus::Confirmed];
        }

        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                errors.add_error("end_date", "end_date must not be before start_date.", "invalid_range");
            } else if (end - start).num_days() > CALENDAR_MAX_DAYS {
                errors.add_error(
                    "end_date",
                    format!("Date range cannot exceed {} days.", CALENDAR_MAX_DAYS),
                    "range_too_long",
                );
            }
        }
        let (Some(start_date), Some(end_date)) = (start, end) else {
            return Err(errors);
        };
        errors.into_result()?;

        Ok(Self {
            start_date,
            end_date,
            provider_id,
            service_id,
            statuses,
        })
    }

    /// Every day of the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start_date;
        (0..=(self.end_date - self.start_date).num_days()).map(move |offset| start + Duration::days(offset))
    }

    /// In-process evaluation, shared by the memory store and tests
    pub fn matches(&self, booking: &Booking) -> bool {
        let day = booking.booking_date.date_naive();
        day >= self.start_date
            && day <= self.end_date
            && self.statuses.contains(&booking.status)
            && self.provider_id.map_or(true, |id| booking.provider_id == id)
            && self.service_id.map_or(true, |id| booking.service_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_service_filter_ignores_garbage() {
        let filter = ServiceFilter::from_query(Some("true"), Some("abc"), Some("100"), None, Some("  "));
        assert_eq!(filter.available, Some(true));
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(dec!(100)));
        assert_eq!(filter.university, None);
    }

    #[test]
    fn test_service_ordering() {
        assert_eq!(ServiceOrdering::parse(None), ServiceOrdering::default());
        assert_eq!(ServiceOrdering::parse(Some("bogus")), ServiceOrdering::default());
        assert_eq!(
            ServiceOrdering::parse(Some("-price")).keys,
            vec![(ServiceSortKey::Price, SortDirection::Descending)]
        );
        assert_eq!(
            ServiceOrdering::parse(Some("date")).keys,
            vec![(ServiceSortKey::Date, SortDirection::Ascending)]
        );
    }

    #[test]
    fn test_furniture_filter_defaults_to_unsold() {
        let filter = FurnitureFilter::from_query(Some("books"), Some("mint"), None, None, Some("desk"), None);
        assert_eq!(filter.category, Some(ItemCategory::Books));
        assert_eq!(filter.condition, None);
        assert!(!filter.include_sold);
        assert_eq!(filter.search.as_deref(), Some("desk"));
    }

    #[test]
    fn test_booking_filter_matches() {
        let now = Utc::now();
        let upcoming = BookingFilter::from_query(None, None, None, Some("true"), None, None);
        assert!(upcoming.matches(BookingStatus::Confirmed, now + Duration::days(1), now));
        assert!(!upcoming.matches(BookingStatus::Cancelled, now + Duration::days(1), now));
        assert!(!upcoming.matches(BookingStatus::Pending, now - Duration::days(1), now));

        let past = BookingFilter::from_query(None, None, None, None, Some("true"), Some("booking_date"));
        assert_eq!(past.direction, SortDirection::Ascending);
        assert!(past.matches(BookingStatus::Completed, now - Duration::days(1), now));

        let status = BookingFilter::from_query(Some("pending"), None, None, None, None, None);
        assert!(!status.matches(BookingStatus::Confirmed, now, now));
    }

    #[test]
    fn test_calendar_query_defaults_and_days() {
        let query = CalendarQuery::parse(Some("2026-03-30"), Some("2026-04-02"), None, None, None).unwrap();
        assert_eq!(query.statuses, vec![BookingStatus::Pending, BookingStatus::Confirmed]);
        let days: Vec<String> = query.days().map(|d| d.to_string()).collect();
        assert_eq!(days, vec!["2026-03-30", "2026-03-31", "2026-04-01", "2026-04-02"]);

        let single = CalendarQuery::parse(Some("2026-05-01"), Some("2026-05-01"), None, None, Some("completed,pending"))
            .unwrap();
        assert_eq!(single.days().count(), 1);
        assert_eq!(single.statuses, vec![BookingStatus::Completed, BookingStatus::Pending]);
    }

    #[test]
    fn test_calendar_query_rejects_bad_input() {
        let errors = CalendarQuery::parse(None, Some("05/01/2026"), Some("nope"), None, Some("lost")).unwrap_err();
        for field in ["start_date", "end_date", "provider", "status"] {
            assert!(errors.has_field(field), "missing {}", field);
        }

        let reversed = CalendarQuery::parse(Some("2026-05-02"), Some("2026-05-01"), None, None, None).unwrap_err();
        assert_eq!(reversed.errors()[0].code, "invalid_range");

        let too_long = CalendarQuery::parse(Some("2026-01-01"), Some("2026-04-02"), None, None, None).unwrap_err();
        assert_eq!(too_long.errors()[0].code, "range_too_long");
        assert!(CalendarQuery::parse(Some("2026-01-01"), Some("2026-04-01"), None, None, None).is_ok());
    }
}
