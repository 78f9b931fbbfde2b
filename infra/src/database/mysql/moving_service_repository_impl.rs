//! MySQL implementation of the MovingServiceRepository trait.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use uuid::Uuid;

use cm_core::domain::entities::moving_service::MovingService;
use cm_core::domain::value_objects::query::{ServiceFilter, ServiceOrdering, ServiceSortKey, SortDirection};
use cm_core::errors::DomainError;
use cm_core::repositories::MovingServiceRepository;
use cm_shared::{PaginatedResponse, Pagination};

use super::{col, contains_pattern, db_err, is_foreign_key_violation, page, uuid_col};

const SERVICE_COLUMNS: &str = "s.id, s.provider_id, s.service_name, s.description, s.base_price, \
     s.availability_status, s.rating_average, s.total_reviews, s.created_at, s.updated_at";

/// MySQL implementation of MovingServiceRepository
pub struct MySqlMovingServiceRepository {
    pool: MySqlPool,
}

impl MySqlMovingServiceRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_service(row: &MySqlRow) -> Result<MovingService, DomainError> {
        Ok(MovingService {
            id: uuid_col(row, "id")?,
            provider_id: uuid_col(row, "provider_id")?,
            service_name: col(row, "service_name")?,
            description: col(row, "description")?,
            base_price: col(row, "base_price")?,
            availability_status: col(row, "availability_status")?,
            rating_average: col(row, "rating_average")?,
            total_reviews: col(row, "total_reviews")?,
            created_at: col(row, "created_at")?,
            updated_at: col(row, "updated_at")?,
        })
    }

    /// `FROM ... WHERE ...` shared by the page query and its count
    fn push_filtered_from(builder: &mut QueryBuilder<'_, MySql>, filter: &ServiceFilter) {
        builder.push(" FROM moving_services s JOIN users u ON u.id = s.provider_id WHERE 1 = 1");
        if let Some(available) = filter.available {
            builder.push(" AND s.availability_status = ").push_bind(available);
        }
        if let Some(min) = filter.min_price {
            builder.push(" AND s.base_price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            builder.push(" AND s.base_price <= ").push_bind(max);
        }
        if let Some(min) = filter.min_rating {
            builder.push(" AND s.rating_average >= ").push_bind(min);
        }
        if let Some(university) = &filter.university {
            builder
                .push(" AND LOWER(u.university_name) LIKE ")
                .push_bind(contains_pattern(&university.to_lowercase()));
        }
    }

    fn push_order(builder: &mut QueryBuilder<'_, MySql>, ordering: &ServiceOrdering) {
        builder.push(" ORDER BY ");
        for (key, direction) in &ordering.keys {
            let column = match key {
                ServiceSortKey::Price => "s.base_price",
                ServiceSortKey::Rating => "s.rating_average",
                ServiceSortKey::Date => "s.created_at",
            };
            let direction = match direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            builder.push(column).push(" ").push(direction).push(", ");
        }
        builder.push("s.id ASC");
    }
}

#[async_trait]
impl MovingServiceRepository for MySqlMovingServiceRepository {
    async fn create(&self, service: MovingService) -> Result<MovingService, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO moving_services (
                id, provider_id, service_name, description, base_price,
                availability_status, rating_average, total_reviews, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(service.id.to_string())
        .bind(service.provider_id.to_string())
        .bind(&service.service_name)
        .bind(&service.description)
        .bind(service.base_price)
        .bind(service.availability_status)
        .bind(service.rating_average)
        .bind(service.total_reviews)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                DomainError::not_found("User")
            } else {
                db_err("Failed to create moving service")(e)
            }
        })?;

        Ok(service)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MovingService>, DomainError> {
        let query = format!("SELECT {} FROM moving_services s WHERE s.id = ?", SERVICE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find moving service"))?;

        row.as_ref().map(Self::row_to_service).transpose()
    }

    async fn update(&self, service: MovingService) -> Result<MovingService, DomainError> {
        sqlx::query(
            r#"
            UPDATE moving_services
            SET service_name = ?, description = ?, base_price = ?, availability_status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&service.service_name)
        .bind(&service.description)
        .bind(service.base_price)
        .bind(service.availability_status)
        .bind(service.updated_at)
        .bind(service.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to update moving service"))?;

        self.find_by_id(service.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Moving service"))
    }

    async fn search(
        &self,
        filter: &ServiceFilter,
        ordering: &ServiceOrdering,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<MovingService>, DomainError> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) AS total");
        Self::push_filtered_from(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count moving services"))?;

        let mut select = QueryBuilder::<MySql>::new("SELECT ");
        select.push(SERVICE_COLUMNS);
        Self::push_filtered_from(&mut select, filter);
        Self::push_order(&mut select, ordering);
        select
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to search moving services"))?;

        let services = rows.iter().map(Self::row_to_service).collect::<Result<Vec<_>, _>>()?;
        Ok(page(services, pagination, total))
    }

    async fn list_batch(&self, offset: u64, limit: u64) -> Result<Vec<MovingService>, DomainError> {
        let query = format!(
            "SELECT {} FROM moving_services s ORDER BY s.created_at, s.id LIMIT ? OFFSET ?",
            SERVICE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list moving services"))?;

        rows.iter().map(Self::row_to_service).collect()
    }

    async fn update_rating(&self, id: Uuid, rating_average: Decimal, total_reviews: u32) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE moving_services SET rating_average = ?, total_reviews = ?, updated_at = ? WHERE id = ?",
        )
        .bind(rating_average)
        .bind(total_reviews)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to update service rating"))?;

        if result.rows_affected() == 0 && self.find_by_id(id).await?.is_none() {
            return Err(DomainError::not_found("Moving service"));
        }
        Ok(())
    }
}
