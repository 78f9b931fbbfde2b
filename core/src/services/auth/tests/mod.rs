//! Tests for authentication service

mod mocks;
mod service_tests;
