use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use cm_core::domain::entities::token::TokenPair;
use cm_core::domain::entities::user::{User, UserRole};
use cm_core::services::{ProfileUpdate, Registration};
use cm_shared::config::MediaConfig;
use cm_shared::validation::ValidationErrors;

use super::{parse_choice, ImagePayload};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 128))]
    pub password_confirm: String,
    /// `student` or `provider`
    pub user_type: String,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub university_name: String,
}

impl RegisterRequest {
    pub fn into_registration(self) -> Result<Registration, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let role = parse_choice::<UserRole>("user_type", &self.user_type, &mut errors);
        let Some(role) = role else {
            return Err(errors);
        };
        Ok(Registration {
            email: self.email,
            password: self.password,
            password_confirm: self.password_confirm,
            role,
            phone_number: self.phone_number,
            university_name: self.university_name,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Body of logout, refresh and blacklist calls
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyTokenRequest {
    #[validate(length(min = 1))]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyProviderRequest {
    pub user_id: Uuid,
}

/// Profile edit. `PUT` needs `university_name`; `PATCH` takes any subset.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub university_name: Option<String>,
    pub profile_image: Option<ImagePayload>,
}

impl ProfileRequest {
    pub fn into_update(self, full: bool) -> Result<ProfileUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if full && self.university_name.is_none() {
            errors.add_error("university_name", "This field is required.", "required");
        }
        let profile_image = match &self.profile_image {
            Some(payload) => match payload.decode("profile_image") {
                Ok(upload) => Some(upload),
                Err(e) => {
                    errors.merge(Err(e));
                    None
                }
            },
            None => None,
        };
        errors.into_result()?;
        Ok(ProfileUpdate {
            phone_number: self.phone_number,
            university_name: self.university_name,
            profile_image,
        })
    }
}

/// Account as returned by the API; the password hash never leaves the server
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub user_type: UserRole,
    pub phone_number: Option<String>,
    pub university_name: String,
    /// Absolute media URL
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub is_staff: bool,
    pub avg_rating_as_provider: Decimal,
    pub avg_rating_as_student: Decimal,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: User, media: &MediaConfig) -> Self {
        Self {
            id: user.id,
            email: user.email,
            user_type: user.role,
            phone_number: user.phone_number,
            university_name: user.university_name,
            profile_image: user.profile_image.map(|path| media.url_for(&path)),
            is_verified: user.is_verified,
            is_staff: user.is_staff,
            avg_rating_as_provider: user.avg_rating_as_provider,
            avg_rating_as_student: user.avg_rating_as_student,
            created_at: user.created_at,
        }
    }
}

/// Registration and login answer: the account plus a token pair
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(user_type: &str) -> RegisterRequest {
        RegisterRequest {
            email: "ana@uni.edu".to_string(),
            password: "moving123".to_string(),
            password_confirm: "moving123".to_string(),
            user_type: user_type.to_string(),
            phone_number: None,
            university_name: "State University".to_string(),
        }
    }

    #[test]
    fn test_user_type_is_a_closed_choice() {
        assert_eq!(register("provider").into_registration().unwrap().role, UserRole::Provider);
        let errors = register("admin").into_registration().unwrap_err();
        assert!(errors.has_field("user_type"));
    }

    #[test]
    fn test_put_requires_university() {
        let errors = ProfileRequest::default().into_update(true).unwrap_err();
        assert!(errors.has_field("university_name"));
        assert!(ProfileRequest::default().into_update(false).is_ok());
    }

    #[test]
    fn test_user_response_exposes_media_url() {
        let mut user = User::new("ana@uni.edu", "hash".to_string(), UserRole::Student, "Uni");
        user.profile_image = Some("profile_images/x/y.png".to_string());
        let media = MediaConfig::default();
        let json = serde_json::to_value(UserResponse::new(user, &media)).unwrap();
        assert_eq!(json["user_type"], "student");
        assert_eq!(json["profile_image"], "/media/profile_images/x/y.png");
        assert!(json.get("password_hash").is_none());
    }
}
