//! Database module - MySQL implementations using SQLx
//!
//! This module provides the database access layer:
//! - Connection pool management and migrations
//! - Repository implementations for every core repository trait
//! - Row locking (`SELECT ... FOR UPDATE`) around read-modify-write paths

pub mod connection;
pub mod mysql;


pub use connection::DatabasePool;
pub use mysql::{
    MySqlBookingRepository, MySqlFurnitureRepository, MySqlMovingServiceRepository, MySqlReviewRepository,
    MySqlTokenRepository, MySqlUserRepository,
};
