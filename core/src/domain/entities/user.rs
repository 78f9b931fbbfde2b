//! User entity representing a registered account on the marketplace.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cm_shared::email::{normalize_email, validate_email};
use cm_shared::phone::validate_phone_number;
use cm_shared::validation::{validators, ValidationErrors};

use crate::errors::DomainError;

/// Upper bound for the per-role rating averages
pub const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// The two kinds of account. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Books moving services
    Student,
    /// Lists moving services
    Provider,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Provider => "provider",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "provider" => Ok(UserRole::Provider),
            other => Err(format!("unknown user role: {}", other)),
        }
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    /// Stored lowercase; unique case-insensitively
    pub email: String,

    /// bcrypt hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: UserRole,

    pub phone_number: Option<String>,

    pub university_name: String,

    /// Relative media path of the profile picture
    pub profile_image: Option<String>,

    /// Set by staff, only meaningful for providers
    pub is_verified: bool,

    pub is_staff: bool,

    /// Cleared instead of deleting the account
    pub is_active: bool,

    pub avg_rating_as_provider: Decimal,

    pub avg_rating_as_student: Decimal,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Mutable profile fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    /// `Some("")` clears the phone number
    pub phone_number: Option<String>,
    pub university_name: Option<String>,
    pub profile_image: Option<String>,
}

impl User {
    /// Creates a new active, unverified user
    pub fn new(
        email: &str,
        password_hash: String,
        role: UserRole,
        university_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash,
            role,
            phone_number: None,
            university_name: university_name.into().trim().to_string(),
            profile_image: None,
            is_verified: false,
            is_staff: false,
            is_active: true,
            avg_rating_as_provider: Decimal::ZERO,
            avg_rating_as_student: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    pub fn with_phone_number(mut self, phone_number: Option<String>) -> Self {
        self.phone_number = phone_number.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn is_student(&self) -> bool {
        matches!(self.role, UserRole::Student)
    }

    pub fn is_provider(&self) -> bool {
        matches!(self.role, UserRole::Provider)
    }

    /// Field-level checks run before every save
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validate_email(&self.email));
        if let Some(phone) = &self.phone_number {
            errors.check(validate_phone_number(phone));
        }
        errors.check(validators::required_text("university_name", &self.university_name, 200));
        for (field, rating) in [
            ("avg_rating_as_provider", self.avg_rating_as_provider),
            ("avg_rating_as_student", self.avg_rating_as_student),
        ] {
            if rating < Decimal::ZERO || rating > MAX_RATING {
                errors.add_error(field, "Rating must be between 0 and 5.", "out_of_range");
            }
        }
        errors.into_result()
    }

    /// Apply a profile edit. Email, role and the staff/verified flags are not
    /// reachable from here.
    pub fn apply_profile_changes(&mut self, changes: ProfileChanges) -> Result<(), ValidationErrors> {
        let mut updated = self.clone();
        if let Some(phone) = changes.phone_number {
            let phone = phone.trim().to_string();
            updated.phone_number = if phone.is_empty() { None } else { Some(phone) };
        }
        if let Some(university) = changes.university_name {
            updated.university_name = university.trim().to_string();
        }
        if let Some(image) = changes.profile_image {
            updated.profile_image = Some(image);
        }
        updated.validate()?;
        updated.updated_at = Utc::now();
        *self = updated;
        Ok(())
    }

    /// Mark a provider as verified. Returns `false` when it already was.
    pub fn verify_provider(&mut self) -> Result<bool, DomainError> {
        ensure_role(self, UserRole::Provider, "user_id")?;
        if self.is_verified {
            return Ok(false);
        }
        self.is_verified = true;
        self.updated_at = Utc::now();
        Ok(true)
    }

    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// The stored average for the role this user holds
    pub fn rating_for_own_role(&self) -> Decimal {
        match self.role {
            UserRole::Student => self.avg_rating_as_student,
            UserRole::Provider => self.avg_rating_as_provider,
        }
    }
}

/// Role check for a referenced user; the error is keyed to `field`
pub fn ensure_role(user: &User, expected: UserRole, field: &str) -> Result<(), DomainError> {
    check_role(user.role, expected, field)
}

/// `ensure_role` for callers that only loaded the role column
pub fn check_role(actual: UserRole, expected: UserRole, field: &str) -> Result<(), DomainError> {
    if actual == expected {
        Ok(())
    } else {
        Err(DomainError::RoleMismatch {
            field: field.to_string(),
            expected,
            actual,
        })
    }
}
