//! In-process storage backing every repository trait.
//!
//! All tables sit behind one `RwLock`, so any operation that touches several
//! rows (booking slot checks, review aggregates, purchases) runs under a
//! single write guard and is atomic with respect to every other call.

use std::collections::HashMap;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::domain::entities::{
    Booking, FurnitureImage, FurnitureItem, FurnitureTransaction, MovingService, RefreshToken, Review,
    User, UserRole,
};
use crate::errors::DomainError;

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub users: HashMap<Uuid, User>,
    pub services: HashMap<Uuid, MovingService>,
    pub bookings: HashMap<Uuid, Booking>,
    pub reviews: HashMap<Uuid, Review>,
    pub items: HashMap<Uuid, FurnitureItem>,
    pub images: HashMap<Uuid, FurnitureImage>,
    pub transactions: HashMap<Uuid, FurnitureTransaction>,
    /// Keyed by `jti`
    pub refresh_tokens: HashMap<String, RefreshToken>,
}

impl Tables {
    pub fn user(&self, id: Uuid) -> Result<&User, DomainError> {
        self.users.get(&id).ok_or_else(|| DomainError::not_found("User"))
    }

    pub fn service(&self, id: Uuid) -> Result<&MovingService, DomainError> {
        self.services.get(&id).ok_or_else(|| DomainError::not_found("Moving service"))
    }

    pub fn booking(&self, id: Uuid) -> Result<&Booking, DomainError> {
        self.bookings.get(&id).ok_or_else(|| DomainError::not_found("Booking"))
    }

    pub fn item(&self, id: Uuid) -> Result<&FurnitureItem, DomainError> {
        self.items.get(&id).ok_or_else(|| DomainError::not_found("Furniture item"))
    }

    /// Role the reviewee of `review` held in its booking
    pub fn reviewee_role(&self, review: &Review) -> Option<UserRole> {
        self.bookings.get(&review.booking_id).map(|booking| {
            if review.is_about_provider(booking) {
                UserRole::Provider
            } else {
                UserRole::Student
            }
        })
    }

    /// Ratings of provider-directed reviews on bookings of `service_id`
    pub fn service_ratings(&self, service_id: Uuid) -> Vec<u8> {
        self.reviews
            .values()
            .filter(|review| {
                self.bookings
                    .get(&review.booking_id)
                    .map_or(false, |b| b.service_id == service_id && review.is_about_provider(b))
            })
            .map(|review| review.rating)
            .collect()
    }

    /// Ratings received by `user_id` while holding `role`
    pub fn user_ratings(&self, user_id: Uuid, role: UserRole) -> Vec<u8> {
        self.reviews
            .values()
            .filter(|review| review.reviewee_id == user_id && self.reviewee_role(review) == Some(role))
            .map(|review| review.rating)
            .collect()
    }
}

/// Shared in-process store; clone the `Arc` it lives in to hand it to
/// several repositories
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }
}
