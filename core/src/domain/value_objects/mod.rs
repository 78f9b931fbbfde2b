//! Value objects representing immutable domain concepts.

pub mod auth_response;
pub mod money;
pub mod query;

// Re-export commonly used types
pub use auth_response::AuthResponse;
pub use query::{BookingFilter, CalendarQuery, FurnitureFilter, ServiceFilter, ServiceOrdering, ServiceSortKey, SortDirection};
