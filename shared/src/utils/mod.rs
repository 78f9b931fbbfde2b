//! Stateless validators and helpers

pub mod email;
pub mod image;
pub mod password;
pub mod phone;
pub mod validation;

pub use validation::{Validate, ValidationError, ValidationErrors};
