//! Moving-service catalogue: listing, detail and provider-owned edits

mod service;

#[cfg(test)]
mod tests;

pub use service::{CatalogService, NewService, ProviderSummary, ServiceDetail, RECENT_REVIEWS};
