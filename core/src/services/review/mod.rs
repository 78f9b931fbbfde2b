//! Reviews of completed bookings, rating summaries and the aggregate
//! recalculation job

mod recalculate;
mod service;


pub use recalculate::{RecalculationOptions, RecalculationReport};
pub use service::{ReviewService, ServiceRatingSummary};
