//! Second-hand marketplace: listings, galleries and purchases

mod service;

#[cfg(test)]
mod tests;

pub use service::{FurnitureDetail, FurnitureService};
