use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use cm_core::domain::entities::moving_service::ServiceChanges;
use cm_core::services::{NewService, ServiceDetail};
use cm_shared::config::MediaConfig;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 200))]
    pub service_name: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub base_price: Decimal,
}

impl From<CreateServiceRequest> for NewService {
    fn from(request: CreateServiceRequest) -> Self {
        NewService {
            service_name: request.service_name,
            description: request.description,
            base_price: request.base_price,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 200))]
    pub service_name: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub availability_status: Option<bool>,
}

impl From<UpdateServiceRequest> for ServiceChanges {
    fn from(request: UpdateServiceRequest) -> Self {
        ServiceChanges {
            service_name: request.service_name,
            description: request.description,
            base_price: request.base_price,
            availability_status: request.availability_status,
        }
    }
}

/// Rewrite stored media paths in a detail view into public URLs
pub fn with_media_urls(mut detail: ServiceDetail, media: &MediaConfig) -> ServiceDetail {
    detail.provider.profile_image = detail.provider.profile_image.map(|path| media.url_for(&path));
    detail
}
