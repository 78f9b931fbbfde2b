use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::furniture::{
    FurnitureImage, FurnitureItem, FurnitureTransaction, NewFurnitureItem,
};
use crate::domain::entities::user::User;
use crate::domain::value_objects::query::FurnitureFilter;
use crate::errors::DomainError;
use crate::repositories::furniture::r#trait::too_many_images_error;
use crate::repositories::FurnitureRepository;
use crate::services::media::{save_image, ImageUpload, MediaStorage, FURNITURE_IMAGES};

/// A listing with its gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FurnitureDetail {
    #[serde(flatten)]
    pub item: FurnitureItem,
    pub images: Vec<FurnitureImage>,
}

pub struct FurnitureService {
    furniture: Arc<dyn FurnitureRepository>,
    media: Arc<dyn MediaStorage>,
    max_images: usize,
}

impl FurnitureService {
    pub fn new(furniture: Arc<dyn FurnitureRepository>, media: Arc<dyn MediaStorage>, max_images: usize) -> Self {
        Self {
            furniture,
            media,
            max_images,
        }
    }

    pub async fn create_item(&self, actor: &User, input: NewFurnitureItem) -> Result<FurnitureItem, DomainError> {
        let item = FurnitureItem::new(actor.id, input)?;
        let item = self.furniture.create_item(item).await?;
        info!(item_id = %item.id, seller_id = %actor.id, "Furniture item listed");
        Ok(item)
    }

    /// Append a photo to the seller's own listing
    pub async fn add_image(&self, actor: &User, item_id: Uuid, upload: &ImageUpload) -> Result<FurnitureImage, DomainError> {
        let item = self.find_item(item_id).await?;
        if item.seller_id != actor.id {
            return Err(DomainError::permission_denied(
                "You can only add images to your own items.",
            ));
        }
        if self.furniture.list_images(item_id).await?.len() >= self.max_images {
            return Err(too_many_images_error(self.max_images));
        }

        let path = save_image(self.media.as_ref(), "image", FURNITURE_IMAGES, item_id, upload).await?;
        match self
            .furniture
            .add_image(FurnitureImage::new(item_id, path.clone(), 0), self.max_images)
            .await
        {
            Ok(image) => Ok(image),
            Err(err) => {
                // Lost a race for the last slot
                if let Err(e) = self.media.remove(&path).await {
                    warn!(path = %path, error = %e, "Failed to remove orphaned image");
                }
                Err(err)
            }
        }
    }

    pub async fn get_item(&self, id: Uuid) -> Result<FurnitureDetail, DomainError> {
        let item = self.find_item(id).await?;
        let images = self.furniture.list_images(id).await?;
        Ok(FurnitureDetail { item, images })
    }

    pub async fn browse(
        &self,
        filter: &FurnitureFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<FurnitureItem>, DomainError> {
        self.furniture.list_items(filter, pagination).await
    }

    /// Open a pending purchase; `sale_price` defaults to the asking price
    pub async fn purchase(
        &self,
        actor: &User,
        item_id: Uuid,
        sale_price: Option<Decimal>,
    ) -> Result<FurnitureTransaction, DomainError> {
        let item = self.find_item(item_id).await?;
        let transaction = FurnitureTransaction::new(&item, actor.id, sale_price)?;
        let transaction = self.furniture.purchase(transaction).await?;
        info!(
            transaction_id = %transaction.id,
            item_id = %item_id,
            buyer_id = %actor.id,
            "Furniture purchase opened"
        );
        Ok(transaction)
    }

    /// Confirm receipt; the item is sold from here on
    pub async fn complete(&self, actor: &User, transaction_id: Uuid) -> Result<FurnitureTransaction, DomainError> {
        self.find_own_transaction(actor, transaction_id).await?;
        let transaction = self.furniture.complete_transaction(transaction_id, Utc::now()).await?;
        info!(transaction_id = %transaction.id, item_id = %transaction.item_id, "Furniture purchase completed");
        Ok(transaction)
    }

    pub async fn cancel(&self, actor: &User, transaction_id: Uuid) -> Result<FurnitureTransaction, DomainError> {
        self.find_own_transaction(actor, transaction_id).await?;
        let transaction = self.furniture.cancel_transaction(transaction_id, Utc::now()).await?;
        info!(transaction_id = %transaction.id, "Furniture purchase cancelled");
        Ok(transaction)
    }

    pub async fn list_transactions(
        &self,
        actor: &User,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<FurnitureTransaction>, DomainError> {
        self.furniture.list_transactions(actor.id, pagination).await
    }

    async fn find_item(&self, id: Uuid) -> Result<FurnitureItem, DomainError> {
        self.furniture
            .find_item(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Furniture item"))
    }

    async fn find_own_transaction(&self, actor: &User, id: Uuid) -> Result<FurnitureTransaction, DomainError> {
        let transaction = self
            .furniture
            .find_transaction(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Transaction"))?;
        if !transaction.is_party(actor.id) {
            return Err(DomainError::permission_denied(
                "You are not a party to this transaction.",
            ));
        }
        Ok(transaction)
    }
}
