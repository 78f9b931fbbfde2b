use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use cm_core::domain::entities::review::ReviewChanges;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: i64,
    #[validate(length(min = 1, max = 2000))]
    pub comment: String,
}

impl CreateReviewRequest {
    /// Star value once the range check has passed
    pub fn stars(&self) -> u8 {
        self.rating.clamp(1, 5) as u8
    }
}

/// Partial edit; reviewer, reviewee and booking are not accepted and any such
/// keys in the body are ignored
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: Option<i64>,
    #[validate(length(min = 1, max = 2000))]
    pub comment: Option<String>,
}

impl From<UpdateReviewRequest> for ReviewChanges {
    fn from(request: UpdateReviewRequest) -> Self {
        ReviewChanges {
            rating: request.rating.map(|rating| rating.clamp(1, 5) as u8),
            comment: request.comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_ignores_party_fields() {
        let request: UpdateReviewRequest =
            serde_json::from_value(serde_json::json!({ "rating": 3, "reviewer": "someone", "booking": 7 })).unwrap();
        assert!(request.validate().is_ok());
        let changes = ReviewChanges::from(request);
        assert_eq!(changes.rating, Some(3));
        assert!(changes.comment.is_none());
    }

    #[test]
    fn test_update_rating_range() {
        let request = UpdateReviewRequest {
            rating: Some(9),
            comment: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("rating"));
    }
}
