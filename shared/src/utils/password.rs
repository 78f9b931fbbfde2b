//! Password strength rules applied at registration

use super::validation::{ValidationError, ValidationErrors};

/// Check a new password against the policy; every failure is reported
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if password.chars().count() < min_length {
        errors.add(ValidationError::new(
            "password",
            format!(
                "This password is too short. It must contain at least {} characters.",
                min_length
            ),
            "password_too_short",
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add_error("password", "This password is entirely numeric.", "password_entirely_numeric");
    } else if !password.chars().any(char::is_alphabetic) || !password.chars().any(|c| c.is_ascii_digit()) {
        errors.add_error(
            "password",
            "Password must contain at least one letter and one digit.",
            "password_too_simple",
        );
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_reasonable_password() {
        assert!(validate_password_strength("movingday42", 8).is_ok());
    }

    #[test]
    fn test_rejects_short_and_numeric() {
        let errors = validate_password_strength("1234", 8).unwrap_err();
        let codes: Vec<&str> = errors.errors().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["password_too_short", "password_entirely_numeric"]);
    }

    #[test]
    fn test_requires_a_digit() {
        let errors = validate_password_strength("onlyletters", 8).unwrap_err();
        assert_eq!(errors.errors()[0].code, "password_too_simple");
    }
}
