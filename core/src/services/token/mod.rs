//! Token service module for JWT management
//!
//! This module handles all token-related operations including:
//! - JWT access and refresh token generation and verification
//! - Refresh token rotation with reuse detection per token family
//! - Refresh token revocation and cleanup of expired rows

mod service;

#[cfg(test)]
mod tests;

pub use service::{hash_token, TokenService};
