//! # CampusMove Core
//!
//! Domain layer of the CampusMove backend: entities and their validation
//! rules, the services implementing each use case, the repository
//! interfaces they depend on, and the in-process store implementing them.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::entities::*;
pub use errors::*;
