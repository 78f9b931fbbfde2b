//! Business services containing domain logic and use cases.

pub mod auth;
pub mod booking;
pub mod catalog;
pub mod furniture;
pub mod media;
pub mod review;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use auth::{AuthService, AuthServiceConfig, ProfileUpdate, RateLimitAction, RateLimitDecision, RateLimiter, Registration};
pub use booking::{BookingService, CalendarDay, CalendarEntry};
pub use catalog::{CatalogService, NewService, ProviderSummary, ServiceDetail};
pub use furniture::{FurnitureDetail, FurnitureService};
pub use media::{ImageUpload, MediaStorage};
pub use review::{RecalculationOptions, RecalculationReport, ReviewService, ServiceRatingSummary};
pub use token::TokenService;
