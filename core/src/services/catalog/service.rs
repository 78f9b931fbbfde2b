use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use cm_shared::{PaginatedResponse, Pagination};

use crate::domain::entities::moving_service::{MovingService, ServiceChanges};
use crate::domain::entities::review::{RatingDistribution, Review};
use crate::domain::entities::user::User;
use crate::domain::value_objects::query::{ServiceFilter, ServiceOrdering};
use crate::errors::DomainError;
use crate::repositories::{MovingServiceRepository, ReviewRepository, UserRepository};

/// How many reviews the detail view embeds
pub const RECENT_REVIEWS: u32 = 10;

/// Listing form
#[derive(Debug, Clone)]
pub struct NewService {
    pub service_name: String,
    pub description: String,
    pub base_price: Decimal,
}

/// Public view of the provider behind a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    pub id: Uuid,
    pub email: String,
    pub phone_number: Option<String>,
    pub university_name: String,
    pub is_verified: bool,
    pub profile_image: Option<String>,
    pub provider_rating_average: Decimal,
}

impl From<&User> for ProviderSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            university_name: user.university_name.clone(),
            is_verified: user.is_verified,
            profile_image: user.profile_image.clone(),
            provider_rating_average: user.avg_rating_as_provider,
        }
    }
}

/// A listing with its provider and review statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub service: MovingService,
    pub provider: ProviderSummary,
    pub rating_distribution: RatingDistribution,
    pub recent_reviews: Vec<Review>,
}

pub struct CatalogService {
    services: Arc<dyn MovingServiceRepository>,
    users: Arc<dyn UserRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl CatalogService {
    pub fn new(
        services: Arc<dyn MovingServiceRepository>,
        users: Arc<dyn UserRepository>,
        reviews: Arc<dyn ReviewRepository>,
    ) -> Self {
        Self {
            services,
            users,
            reviews,
        }
    }

    /// List a new service. Only verified providers may do this.
    pub async fn create(&self, actor: &User, input: NewService) -> Result<MovingService, DomainError> {
        if !actor.is_provider() {
            return Err(DomainError::permission_denied("Only providers can create services"));
        }
        if !actor.is_verified {
            return Err(DomainError::permission_denied(
                "Only verified providers can create services",
            ));
        }
        let service = MovingService::new(actor, &input.service_name, &input.description, input.base_price)?;
        let service = self.services.create(service).await?;
        info!(service_id = %service.id, provider_id = %actor.id, "Moving service created");
        Ok(service)
    }

    /// Edit a listing; the owning provider or staff only
    pub async fn update(&self, actor: &User, id: Uuid, changes: ServiceChanges) -> Result<MovingService, DomainError> {
        let mut service = self.find(id).await?;
        if !service.is_owned_by(actor.id) && !actor.is_staff {
            return Err(DomainError::permission_denied(
                "You can only modify your own services",
            ));
        }
        service.apply_changes(changes)?;
        self.services.update(service).await
    }

    pub async fn detail(&self, id: Uuid) -> Result<ServiceDetail, DomainError> {
        let service = self.find(id).await?;
        let provider = self
            .users
            .find_by_id(service.provider_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Provider"))?;
        let ratings = self.reviews.service_ratings(id).await?;
        let recent = self
            .reviews
            .list_for_service(id, Pagination::new(1, RECENT_REVIEWS))
            .await?;

        Ok(ServiceDetail {
            service,
            provider: ProviderSummary::from(&provider),
            rating_distribution: RatingDistribution::from_ratings(ratings),
            recent_reviews: recent.results,
        })
    }

    pub async fn list(
        &self,
        filter: &ServiceFilter,
        ordering: &ServiceOrdering,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<MovingService>, DomainError> {
        self.services.search(filter, ordering, pagination).await
    }

    pub(crate) async fn find(&self, id: Uuid) -> Result<MovingService, DomainError> {
        self.services
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Moving service"))
    }
}
