//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

use super::validation::ValidationError;

// Digits plus the formatting characters people actually type
static PHONE_CHARS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\d\s\-+()]+$").expect("static phone regex compiles")
});

pub const MIN_PHONE_DIGITS: usize = 10;

/// Validate an optional phone number.
///
/// Accepts international formats such as `+1 (234) 567-8900` or
/// `+44 20 7946 0958`. An empty value means "no phone" and passes.
pub fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }

    if !PHONE_CHARS_REGEX.is_match(value) {
        return Err(ValidationError::new(
            "phone_number",
            "Phone number can only contain digits, spaces, dashes, parentheses, and plus sign.",
            "invalid_phone_chars",
        ));
    }

    let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ValidationError::new(
            "phone_number",
            "Phone number must contain at least 10 digits.",
            "phone_too_short",
        ));
    }

    if digits.iter().all(|d| *d == digits[0]) {
        return Err(ValidationError::new(
            "phone_number",
            "Phone number cannot be all the same digit.",
            "invalid_phone_pattern",
        ));
    }

    Ok(())
}

/// Normalize a phone number by removing common formatting characters
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Mask a phone number for logs (e.g., +14****2671)
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    if normalized.len() >= 7 {
        format!(
            "{}****{}",
            &normalized[0..3],
            &normalized[normalized.len() - 4..]
        )
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_international_formats() {
        assert!(validate_phone_number("+14155552671").is_ok());
        assert!(validate_phone_number("+1-234-567-8900").is_ok());
        assert!(validate_phone_number("+44 20 7946 0958").is_ok());
        assert!(validate_phone_number("+1 (234) 567-8900").is_ok());
        assert!(validate_phone_number("2345678900").is_ok());
    }

    #[test]
    fn test_empty_is_allowed() {
        assert!(validate_phone_number("").is_ok());
    }

    #[test]
    fn test_rejects_short_numbers() {
        let err = validate_phone_number("123").unwrap_err();
        assert_eq!(err.field, "phone_number");
        assert_eq!(err.code, "phone_too_short");
    }

    #[test]
    fn test_rejects_bad_characters() {
        let err = validate_phone_number("555-CALL-NOW1").unwrap_err();
        assert_eq!(err.code, "invalid_phone_chars");
    }

    #[test]
    fn test_rejects_repeated_digit() {
        let err = validate_phone_number("0000000000").unwrap_err();
        assert_eq!(err.code, "invalid_phone_pattern");
    }

    #[test]
    fn test_mask_phone_number() {
        assert_eq!(mask_phone_number("+14155552671"), "+14****2671");
        assert_eq!(mask_phone_number("12345"), "****");
    }
}
