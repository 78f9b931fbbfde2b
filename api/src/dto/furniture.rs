use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use cm_core::domain::entities::furniture::{
    FurnitureImage, FurnitureItem, ItemCategory, ItemCondition, NewFurnitureItem,
};
use cm_core::services::FurnitureDetail;
use cm_shared::config::MediaConfig;
use cm_shared::validation::ValidationErrors;

use super::parse_choice;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateFurnitureRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub price: Decimal,
    pub condition: String,
    pub category: String,
}

impl CreateFurnitureRequest {
    pub fn into_new_item(self) -> Result<NewFurnitureItem, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let condition = parse_choice::<ItemCondition>("condition", &self.condition, &mut errors);
        let category = parse_choice::<ItemCategory>("category", &self.category, &mut errors);
        let (Some(condition), Some(category)) = (condition, category) else {
            return Err(errors);
        };
        Ok(NewFurnitureItem {
            title: self.title,
            description: self.description,
            price: self.price,
            condition,
            category,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseRequest {
    /// Defaults to the asking price
    pub sale_price: Option<Decimal>,
}

/// Gallery photo with its public URL
#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    #[serde(flatten)]
    pub image: FurnitureImage,
    pub url: String,
}

impl ImageResponse {
    pub fn new(image: FurnitureImage, media: &MediaConfig) -> Self {
        let url = media.url_for(&image.image);
        Self { image, url }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FurnitureDetailResponse {
    #[serde(flatten)]
    pub item: FurnitureItem,
    pub images: Vec<ImageResponse>,
}

impl FurnitureDetailResponse {
    pub fn new(detail: FurnitureDetail, media: &MediaConfig) -> Self {
        Self {
            item: detail.item,
            images: detail
                .images
                .into_iter()
                .map(|image| ImageResponse::new(image, media))
                .collect(),
        }
    }
}
