//! MySQL implementation of the FurnitureRepository trait.
//!
//! Writes that depend on an item's state (images, purchases, completion)
//! lock the item row first, then the transaction row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};
use uuid::Uuid;

use cm_core::domain::entities::furniture::{
    FurnitureImage, FurnitureItem, FurnitureTransaction, TransactionStatus,
};
use cm_core::domain::value_objects::query::FurnitureFilter;
use cm_core::errors::DomainError;
use cm_core::repositories::furniture::r#trait::{pending_purchase_error, too_many_images_error};
use cm_core::repositories::FurnitureRepository;
use cm_shared::{PaginatedResponse, Pagination};

use super::{col, contains_pattern, db_err, enum_col, is_foreign_key_violation, page, uuid_col};

const ITEM_COLUMNS: &str =
    "id, seller_id, title, description, price, item_condition, category, is_sold, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "id, item_id, buyer_id, seller_id, sale_price, status, completed_at, created_at, updated_at";

/// MySQL implementation of FurnitureRepository
pub struct MySqlFurnitureRepository {
    pool: MySqlPool,
}

impl MySqlFurnitureRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_item(row: &MySqlRow) -> Result<FurnitureItem, DomainError> {
        Ok(FurnitureItem {
            id: uuid_col(row, "id")?,
            seller_id: uuid_col(row, "seller_id")?,
            title: col(row, "title")?,
            description: col(row, "description")?,
            price: col(row, "price")?,
            condition: enum_col(row, "item_condition")?,
            category: enum_col(row, "category")?,
            is_sold: col(row, "is_sold")?,
            created_at: col(row, "created_at")?,
            updated_at: col(row, "updated_at")?,
        })
    }

    fn row_to_image(row: &MySqlRow) -> Result<FurnitureImage, DomainError> {
        Ok(FurnitureImage {
            id: uuid_col(row, "id")?,
            item_id: uuid_col(row, "item_id")?,
            image: col(row, "image")?,
            display_order: col(row, "display_order")?,
            uploaded_at: col(row, "uploaded_at")?,
        })
    }

    fn row_to_transaction(row: &MySqlRow) -> Result<FurnitureTransaction, DomainError> {
        Ok(FurnitureTransaction {
            id: uuid_col(row, "id")?,
            item_id: uuid_col(row, "item_id")?,
            buyer_id: uuid_col(row, "buyer_id")?,
            seller_id: uuid_col(row, "seller_id")?,
            sale_price: col(row, "sale_price")?,
            status: enum_col(row, "status")?,
            completed_at: col(row, "completed_at")?,
            created_at: col(row, "created_at")?,
            updated_at: col(row, "updated_at")?,
        })
    }

    async fn lock_item(conn: &mut MySqlConnection, id: Uuid) -> Result<FurnitureItem, DomainError> {
        let query = format!("SELECT {} FROM furniture_items WHERE id = ? FOR UPDATE", ITEM_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(conn)
            .await
            .map_err(db_err("Failed to lock furniture item"))?
            .ok_or_else(|| DomainError::not_found("Furniture item"))?;
        Self::row_to_item(&row)
    }

    async fn lock_transaction(conn: &mut MySqlConnection, id: Uuid) -> Result<FurnitureTransaction, DomainError> {
        let query = format!(
            "SELECT {} FROM furniture_transactions WHERE id = ? FOR UPDATE",
            TRANSACTION_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(conn)
            .await
            .map_err(db_err("Failed to lock transaction"))?
            .ok_or_else(|| DomainError::not_found("Transaction"))?;
        Self::row_to_transaction(&row)
    }

    async fn save_transaction_state(
        conn: &mut MySqlConnection,
        transaction: &FurnitureTransaction,
    ) -> Result<(), DomainError> {
        sqlx::query("UPDATE furniture_transactions SET status = ?, completed_at = ?, updated_at = ? WHERE id = ?")
            .bind(transaction.status.as_str())
            .bind(transaction.completed_at)
            .bind(transaction.updated_at)
            .bind(transaction.id.to_string())
            .execute(conn)
            .await
            .map_err(db_err("Failed to update transaction"))?;
        Ok(())
    }

    fn push_item_filter(query: &mut QueryBuilder<'_, MySql>, filter: &FurnitureFilter) {
        query.push(" FROM furniture_items WHERE 1 = 1");
        if !filter.include_sold {
            query.push(" AND is_sold = FALSE");
        }
        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(condition) = filter.condition {
            query.push(" AND item_condition = ").push_bind(condition.as_str());
        }
        if let Some(min) = filter.min_price {
            query.push(" AND price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            query.push(" AND price <= ").push_bind(max);
        }
        if let Some(seller_id) = filter.seller_id {
            query.push(" AND seller_id = ").push_bind(seller_id.to_string());
        }
        if let Some(search) = &filter.search {
            let pattern = contains_pattern(&search.to_lowercase());
            query
                .push(" AND (LOWER(title) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(description) LIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

#[async_trait]
impl FurnitureRepository for MySqlFurnitureRepository {
    async fn create_item(&self, item: FurnitureItem) -> Result<FurnitureItem, DomainError> {
        let query = format!(
            "INSERT INTO furniture_items ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ITEM_COLUMNS
        );
        sqlx::query(&query)
            .bind(item.id.to_string())
            .bind(item.seller_id.to_string())
            .bind(&item.title)
            .bind(&item.description)
            .bind(item.price)
            .bind(item.condition.as_str())
            .bind(item.category.as_str())
            .bind(item.is_sold)
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DomainError::not_found("User")
                } else {
                    db_err("Failed to create furniture item")(e)
                }
            })?;

        Ok(item)
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<FurnitureItem>, DomainError> {
        let query = format!("SELECT {} FROM furniture_items WHERE id = ?", ITEM_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find furniture item"))?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn list_items(
        &self,
        filter: &FurnitureFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<FurnitureItem>, DomainError> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*)");
        Self::push_item_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count furniture items"))?;

        let mut select = QueryBuilder::<MySql>::new("SELECT ");
        select.push(ITEM_COLUMNS);
        Self::push_item_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list furniture items"))?;

        let items = rows.iter().map(Self::row_to_item).collect::<Result<Vec<_>, _>>()?;
        Ok(page(items, pagination, total))
    }

    async fn add_image(&self, mut image: FurnitureImage, max_images: usize) -> Result<FurnitureImage, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        Self::lock_item(&mut tx, image.item_id).await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM furniture_images WHERE item_id = ?")
            .bind(image.item_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("Failed to count furniture images"))?;
        if existing.max(0) as usize >= max_images {
            return Err(too_many_images_error(max_images));
        }

        image.display_order = existing as u32;
        sqlx::query(
            "INSERT INTO furniture_images (id, item_id, image, display_order, uploaded_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(image.id.to_string())
        .bind(image.item_id.to_string())
        .bind(&image.image)
        .bind(image.display_order)
        .bind(image.uploaded_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to add furniture image"))?;

        tx.commit().await.map_err(db_err("Failed to commit furniture image"))?;
        Ok(image)
    }

    async fn list_images(&self, item_id: Uuid) -> Result<Vec<FurnitureImage>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, item_id, image, display_order, uploaded_at
            FROM furniture_images
            WHERE item_id = ?
            ORDER BY display_order, uploaded_at
            "#,
        )
        .bind(item_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list furniture images"))?;

        rows.iter().map(Self::row_to_image).collect()
    }

    async fn purchase(&self, transaction: FurnitureTransaction) -> Result<FurnitureTransaction, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        let item = Self::lock_item(&mut tx, transaction.item_id).await?;

        // Re-check against the locked row
        FurnitureTransaction::new(&item, transaction.buyer_id, Some(transaction.sale_price))?;
        let pending = sqlx::query("SELECT id FROM furniture_transactions WHERE item_id = ? AND status = ? LIMIT 1")
            .bind(item.id.to_string())
            .bind(TransactionStatus::Pending.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to check pending purchases"))?;
        if pending.is_some() {
            return Err(pending_purchase_error());
        }

        let query = format!(
            "INSERT INTO furniture_transactions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRANSACTION_COLUMNS
        );
        sqlx::query(&query)
            .bind(transaction.id.to_string())
            .bind(transaction.item_id.to_string())
            .bind(transaction.buyer_id.to_string())
            .bind(transaction.seller_id.to_string())
            .bind(transaction.sale_price)
            .bind(transaction.status.as_str())
            .bind(transaction.completed_at)
            .bind(transaction.created_at)
            .bind(transaction.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DomainError::not_found("User")
                } else {
                    db_err("Failed to create transaction")(e)
                }
            })?;

        tx.commit().await.map_err(db_err("Failed to commit purchase"))?;
        Ok(transaction)
    }

    async fn complete_transaction(&self, id: Uuid, now: DateTime<Utc>) -> Result<FurnitureTransaction, DomainError> {
        let item_id = self
            .find_transaction(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Transaction"))?
            .item_id;

        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        Self::lock_item(&mut tx, item_id).await?;
        let mut transaction = Self::lock_transaction(&mut tx, id).await?;

        transaction.complete(now)?;
        Self::save_transaction_state(&mut tx, &transaction).await?;
        sqlx::query("UPDATE furniture_items SET is_sold = TRUE, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(item_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to mark item sold"))?;

        tx.commit().await.map_err(db_err("Failed to commit completion"))?;
        Ok(transaction)
    }

    async fn cancel_transaction(&self, id: Uuid, now: DateTime<Utc>) -> Result<FurnitureTransaction, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;
        let mut transaction = Self::lock_transaction(&mut tx, id).await?;

        transaction.cancel(now)?;
        Self::save_transaction_state(&mut tx, &transaction).await?;

        tx.commit().await.map_err(db_err("Failed to commit cancellation"))?;
        Ok(transaction)
    }

    async fn find_transaction(&self, id: Uuid) -> Result<Option<FurnitureTransaction>, DomainError> {
        let query = format!("SELECT {} FROM furniture_transactions WHERE id = ?", TRANSACTION_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find transaction"))?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<FurnitureTransaction>, DomainError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM furniture_transactions WHERE buyer_id = ? OR seller_id = ?")
                .bind(user_id.to_string())
                .bind(user_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(db_err("Failed to count transactions"))?;

        let query = format!(
            "SELECT {} FROM furniture_transactions WHERE buyer_id = ? OR seller_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(user_id.to_string())
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list transactions"))?;

        let transactions = rows.iter().map(Self::row_to_transaction).collect::<Result<Vec<_>, _>>()?;
        Ok(page(transactions, pagination, total))
    }
}
