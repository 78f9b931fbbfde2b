//! Authentication response value object for API responses.

use serde::Serialize;

use crate::domain::entities::token::TokenPair;
use crate::domain::entities::user::User;

/// Returned by registration and login: the account plus a fresh token pair
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: TokenPair,
}

impl AuthResponse {
    pub fn new(user: User, tokens: TokenPair) -> Self {
        Self { user, tokens }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::user::UserRole;

    #[test]
    fn test_serializes_user_without_hash() {
        let user = User::new("a@uni.edu", "secret-hash".to_string(), UserRole::Student, "Uni");
        let response = AuthResponse::new(user, TokenPair::new("a".to_string(), "r".to_string(), 900));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["user"]["email"], "a@uni.edu");
        assert!(json["user"].get("password_hash").is_none());
        assert_eq!(json["tokens"]["access"], "a");
    }
}
