//! Domain entities representing core business objects.

pub mod booking;
pub mod furniture;
pub mod moving_service;
pub mod review;
pub mod token;
pub mod user;

// Re-export commonly used types
pub use booking::{Booking, BookingChanges, BookingStatus, NewBooking};
pub use furniture::{
    FurnitureImage, FurnitureItem, FurnitureTransaction, ItemCategory, ItemCondition, NewFurnitureItem,
    TransactionStatus,
};
pub use moving_service::{MovingService, ServiceChanges};
pub use review::{RatingDistribution, RatingStats, ReceivedReview, Review, ReviewChanges, UserRatingSummary};
pub use token::{Claims, RefreshToken, TokenPair, TokenType};
pub use user::{ProfileChanges, User, UserRole};
