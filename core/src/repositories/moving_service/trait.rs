//! Moving service repository trait for catalogue persistence.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::moving_service::MovingService;
use crate::domain::value_objects::query::{ServiceFilter, ServiceOrdering};
use crate::errors::DomainError;

#[async_trait]
pub trait MovingServiceRepository: Send + Sync {
    /// Insert a listing. The provider must exist.
    async fn create(&self, service: MovingService) -> Result<MovingService, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MovingService>, DomainError>;

    /// Replace the editable columns of a stored listing
    async fn update(&self, service: MovingService) -> Result<MovingService, DomainError>;

    /// Filtered, ordered page of the catalogue
    async fn search(
        &self,
        filter: &ServiceFilter,
        ordering: &ServiceOrdering,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<MovingService>, DomainError>;

    /// Listings ordered by creation time, for batch jobs
    async fn list_batch(&self, offset: u64, limit: u64) -> Result<Vec<MovingService>, DomainError>;

    /// Overwrite the review aggregates
    async fn update_rating(&self, id: Uuid, rating_average: Decimal, total_reviews: u32) -> Result<(), DomainError>;
}
