//! Repository interfaces and the in-process store implementing all of them.

pub mod booking;
pub mod furniture;
pub mod memory;
pub mod moving_service;
pub mod review;
pub mod token;
pub mod user;

pub use booking::BookingRepository;
pub use furniture::FurnitureRepository;
pub use memory::InMemoryStore;
pub use moving_service::MovingServiceRepository;
pub use review::{r#trait::ReviewDirection, ReviewRepository};
pub use token::TokenRepository;
pub use user::UserRepository;
