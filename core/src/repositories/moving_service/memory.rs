use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::moving_service::MovingService;
use crate::domain::value_objects::query::{ServiceFilter, ServiceOrdering, ServiceSortKey, SortDirection};
use crate::errors::DomainError;
use crate::repositories::memory::{InMemoryStore, Tables};

use super::trait_::MovingServiceRepository;

fn matches(tables: &Tables, service: &MovingService, filter: &ServiceFilter) -> bool {
    if filter.available.map_or(false, |a| a != service.availability_status) {
        return false;
    }
    if filter.min_price.map_or(false, |min| service.base_price < min) {
        return false;
    }
    if filter.max_price.map_or(false, |max| service.base_price > max) {
        return false;
    }
    if filter.min_rating.map_or(false, |min| service.rating_average < min) {
        return false;
    }
    if let Some(university) = &filter.university {
        let wanted = university.to_lowercase();
        let provider_university = tables
            .users
            .get(&service.provider_id)
            .map(|p| p.university_name.to_lowercase())
            .unwrap_or_default();
        if !provider_university.contains(&wanted) {
            return false;
        }
    }
    true
}

fn compare(a: &MovingService, b: &MovingService, ordering: &ServiceOrdering) -> Ordering {
    for (key, direction) in &ordering.keys {
        let ord = match key {
            ServiceSortKey::Price => a.base_price.cmp(&b.base_price),
            ServiceSortKey::Rating => a.rating_average.cmp(&b.rating_average),
            ServiceSortKey::Date => a.created_at.cmp(&b.created_at),
        };
        let ord = match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}

#[async_trait]
impl MovingServiceRepository for InMemoryStore {
    async fn create(&self, service: MovingService) -> Result<MovingService, DomainError> {
        let mut tables = self.write().await;
        tables.user(service.provider_id)?;
        tables.services.insert(service.id, service.clone());
        Ok(service)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MovingService>, DomainError> {
        Ok(self.read().await.services.get(&id).cloned())
    }

    async fn update(&self, service: MovingService) -> Result<MovingService, DomainError> {
        let mut tables = self.write().await;
        let stored = tables
            .services
            .get_mut(&service.id)
            .ok_or_else(|| DomainError::not_found("Moving service"))?;
        stored.service_name = service.service_name;
        stored.description = service.description;
        stored.base_price = service.base_price;
        stored.availability_status = service.availability_status;
        stored.updated_at = service.updated_at;
        Ok(stored.clone())
    }

    async fn search(
        &self,
        filter: &ServiceFilter,
        ordering: &ServiceOrdering,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<MovingService>, DomainError> {
        let tables = self.read().await;
        let mut services: Vec<MovingService> = tables
            .services
            .values()
            .filter(|s| matches(&tables, s, filter))
            .cloned()
            .collect();
        services.sort_by(|a, b| compare(a, b, ordering));
        Ok(pagination.apply(services))
    }

    async fn list_batch(&self, offset: u64, limit: u64) -> Result<Vec<MovingService>, DomainError> {
        let tables = self.read().await;
        let mut services: Vec<MovingService> = tables.services.values().cloned().collect();
        services.sort_by_key(|s| (s.created_at, s.id));
        Ok(services
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update_rating(&self, id: Uuid, rating_average: Decimal, total_reviews: u32) -> Result<(), DomainError> {
        let mut tables = self.write().await;
        let service = tables
            .services
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Moving service"))?;
        service.rating_average = rating_average;
        service.total_reviews = total_reviews;
        service.updated_at = Utc::now();
        Ok(())
    }
}
