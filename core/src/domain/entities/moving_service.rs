//! Moving service listings owned by provider accounts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cm_shared::validation::{validators, ValidationErrors};

use crate::domain::entities::user::{ensure_role, User, UserRole, MAX_RATING};
use crate::domain::value_objects::money::validate_price;
use crate::errors::DomainError;

pub const SERVICE_NAME_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovingService {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub service_name: String,
    pub description: String,
    pub base_price: Decimal,
    /// Whether the provider currently takes bookings
    pub availability_status: bool,
    /// Mean of the provider reviews on this service, in [0, 5]
    pub rating_average: Decimal,
    pub total_reviews: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable listing fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceChanges {
    pub service_name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<Decimal>,
    pub availability_status: Option<bool>,
}

impl MovingService {
    /// Create a listing for `provider`, who must hold the provider role
    pub fn new(
        provider: &User,
        service_name: &str,
        description: &str,
        base_price: Decimal,
    ) -> Result<Self, DomainError> {
        ensure_role(provider, UserRole::Provider, "provider")?;

        let now = Utc::now();
        let service = Self {
            id: Uuid::new_v4(),
            provider_id: provider.id,
            service_name: service_name.trim().to_string(),
            description: description.trim().to_string(),
            base_price,
            availability_status: true,
            rating_average: Decimal::ZERO,
            total_reviews: 0,
            created_at: now,
            updated_at: now,
        };
        service.validate()?;
        Ok(service)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::required_text("service_name", &self.service_name, SERVICE_NAME_MAX_LEN));
        errors.check(validators::required_text("description", &self.description, DESCRIPTION_MAX_LEN));
        errors.check(validate_price("base_price", self.base_price));
        if self.rating_average < Decimal::ZERO || self.rating_average > MAX_RATING {
            errors.add_error("rating_average", "Rating must be between 0 and 5.", "out_of_range");
        }
        errors.into_result()
    }

    pub fn apply_changes(&mut self, changes: ServiceChanges) -> Result<(), ValidationErrors> {
        let mut updated = self.clone();
        if let Some(name) = changes.service_name {
            updated.service_name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            updated.description = description.trim().to_string();
        }
        if let Some(price) = changes.base_price {
            updated.base_price = price;
        }
        if let Some(available) = changes.availability_status {
            updated.availability_status = available;
        }
        updated.validate()?;
        updated.updated_at = Utc::now();
        *self = updated;
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.provider_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn provider() -> User {
        User::new("mover@uni.edu", "h".to_string(), UserRole::Provider, "Uni")
    }

    #[test]
    fn test_new_service_defaults() {
        let service = MovingService::new(&provider(), "Dorm Movers", "Two guys and a van", dec!(80)).unwrap();
        assert!(service.availability_status);
        assert_eq!(service.rating_average, Decimal::ZERO);
        assert_eq!(service.total_reviews, 0);
    }

    #[test]
    fn test_student_cannot_own_service() {
        let student = User::new("s@uni.edu", "h".to_string(), UserRole::Student, "Uni");
        let err = MovingService::new(&student, "Movers", "desc", dec!(10)).unwrap_err();
        match err {
            DomainError::RoleMismatch { field, .. } => assert_eq!(field, "provider"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_field_validation() {
        let err = MovingService::new(&provider(), "  ", "", dec!(0)).unwrap_err();
        match err {
            DomainError::Validation(errors) => {
                assert!(errors.has_field("service_name"));
                assert!(errors.has_field("description"));
                assert!(errors.has_field("base_price"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_apply_changes_is_all_or_nothing() {
        let mut service = MovingService::new(&provider(), "Movers", "desc", dec!(10)).unwrap();
        let result = service.apply_changes(ServiceChanges {
            service_name: Some("Better Movers".to_string()),
            base_price: Some(dec!(-5)),
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(service.service_name, "Movers");

        service
            .apply_changes(ServiceChanges {
                availability_status: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert!(!service.availability_status);
    }
}
