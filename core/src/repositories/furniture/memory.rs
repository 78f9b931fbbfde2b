use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::furniture::{FurnitureImage, FurnitureItem, FurnitureTransaction, TransactionStatus};
use crate::domain::value_objects::query::FurnitureFilter;
use crate::errors::DomainError;
use crate::repositories::memory::InMemoryStore;

use super::trait_::{pending_purchase_error, too_many_images_error, FurnitureRepository};

fn matches(item: &FurnitureItem, filter: &FurnitureFilter) -> bool {
    if item.is_sold && !filter.include_sold {
        return false;
    }
    if filter.category.map_or(false, |c| c != item.category) {
        return false;
    }
    if filter.condition.map_or(false, |c| c != item.condition) {
        return false;
    }
    if filter.min_price.map_or(false, |min| item.price < min) {
        return false;
    }
    if filter.max_price.map_or(false, |max| item.price > max) {
        return false;
    }
    if filter.seller_id.map_or(false, |s| s != item.seller_id) {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !item.title.to_lowercase().contains(&needle) && !item.description.to_lowercase().contains(&needle) {
            return false;
        }
    }
    true
}

#[async_trait]
impl FurnitureRepository for InMemoryStore {
    async fn create_item(&self, item: FurnitureItem) -> Result<FurnitureItem, DomainError> {
        let mut tables = self.write().await;
        tables.user(item.seller_id)?;
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<FurnitureItem>, DomainError> {
        Ok(self.read().await.items.get(&id).cloned())
    }

    async fn list_items(
        &self,
        filter: &FurnitureFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<FurnitureItem>, DomainError> {
        let tables = self.read().await;
        let mut items: Vec<FurnitureItem> = tables.items.values().filter(|i| matches(i, filter)).cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(pagination.apply(items))
    }

    async fn add_image(&self, mut image: FurnitureImage, max_images: usize) -> Result<FurnitureImage, DomainError> {
        let mut tables = self.write().await;
        tables.item(image.item_id)?;
        let existing = tables.images.values().filter(|i| i.item_id == image.item_id).count();
        if existing >= max_images {
            return Err(too_many_images_error(max_images));
        }
        image.display_order = existing as u32;
        tables.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn list_images(&self, item_id: Uuid) -> Result<Vec<FurnitureImage>, DomainError> {
        let tables = self.read().await;
        let mut images: Vec<FurnitureImage> = tables.images.values().filter(|i| i.item_id == item_id).cloned().collect();
        images.sort_by_key(|i| (i.display_order, i.uploaded_at));
        Ok(images)
    }

    async fn purchase(&self, transaction: FurnitureTransaction) -> Result<FurnitureTransaction, DomainError> {
        let mut tables = self.write().await;
        tables.user(transaction.buyer_id)?;
        let item = tables.item(transaction.item_id)?;
        // Re-run the item checks against the locked row
        FurnitureTransaction::new(item, transaction.buyer_id, Some(transaction.sale_price))?;

        let open = tables
            .transactions
            .values()
            .any(|t| t.item_id == transaction.item_id && t.status == TransactionStatus::Pending);
        if open {
            return Err(pending_purchase_error());
        }
        tables.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn complete_transaction(&self, id: Uuid, now: DateTime<Utc>) -> Result<FurnitureTransaction, DomainError> {
        let mut tables = self.write().await;
        let mut transaction = tables
            .transactions
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Transaction"))?;
        let mut item = tables.item(transaction.item_id)?.clone();

        transaction.complete(now)?;
        item.is_sold = true;
        item.updated_at = now;

        tables.items.insert(item.id, item);
        tables.transactions.insert(id, transaction.clone());
        Ok(transaction)
    }

    async fn cancel_transaction(&self, id: Uuid, now: DateTime<Utc>) -> Result<FurnitureTransaction, DomainError> {
        let mut tables = self.write().await;
        let transaction = tables
            .transactions
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Transaction"))?;
        transaction.cancel(now)?;
        Ok(transaction.clone())
    }

    async fn find_transaction(&self, id: Uuid) -> Result<Option<FurnitureTransaction>, DomainError> {
        Ok(self.read().await.transactions.get(&id).cloned())
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<FurnitureTransaction>, DomainError> {
        let tables = self.read().await;
        let mut transactions: Vec<FurnitureTransaction> =
            tables.transactions.values().filter(|t| t.is_party(user_id)).cloned().collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(pagination.apply(transactions))
    }
}
