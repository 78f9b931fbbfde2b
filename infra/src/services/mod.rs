//! Infrastructure implementations of core service seams

pub mod auth;
