//! Furniture marketplace repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::furniture::{FurnitureImage, FurnitureItem, FurnitureTransaction};
use crate::domain::value_objects::query::FurnitureFilter;
use crate::errors::DomainError;

#[async_trait]
pub trait FurnitureRepository: Send + Sync {
    /// Insert a listing. The seller must exist.
    async fn create_item(&self, item: FurnitureItem) -> Result<FurnitureItem, DomainError>;

    async fn find_item(&self, id: Uuid) -> Result<Option<FurnitureItem>, DomainError>;

    /// Filtered page of listings, newest first
    async fn list_items(
        &self,
        filter: &FurnitureFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<FurnitureItem>, DomainError>;

    /// Append an image to an item's gallery unless it already holds
    /// `max_images`. The stored `display_order` is the next free slot.
    async fn add_image(&self, image: FurnitureImage, max_images: usize) -> Result<FurnitureImage, DomainError>;

    /// Gallery of an item in display order
    async fn list_images(&self, item_id: Uuid) -> Result<Vec<FurnitureImage>, DomainError>;

    /// Open a purchase with the item row locked: refused when the item is
    /// sold, the buyer is its seller, or another purchase is still pending
    async fn purchase(&self, transaction: FurnitureTransaction) -> Result<FurnitureTransaction, DomainError>;

    /// Complete a pending purchase and mark its item sold, in one unit
    async fn complete_transaction(&self, id: Uuid, now: DateTime<Utc>) -> Result<FurnitureTransaction, DomainError>;

    /// Cancel a pending purchase; the item stays available
    async fn cancel_transaction(&self, id: Uuid, now: DateTime<Utc>) -> Result<FurnitureTransaction, DomainError>;

    async fn find_transaction(&self, id: Uuid) -> Result<Option<FurnitureTransaction>, DomainError>;

    /// Purchases where `user_id` is buyer or seller, newest first
    async fn list_transactions(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<FurnitureTransaction>, DomainError>;
}

pub fn pending_purchase_error() -> DomainError {
    DomainError::Conflict {
        message: "This item already has a pending purchase.".to_string(),
    }
}

pub fn too_many_images_error(max_images: usize) -> DomainError {
    DomainError::invalid(
        "image",
        format!("An item can have at most {} images.", max_images),
        "too_many_images",
    )
}
