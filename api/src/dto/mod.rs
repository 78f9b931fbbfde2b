//! Request and response bodies
//!
//! Requests are checked twice: shape and presence with `validator` here,
//! business rules in the domain layer. Both report through the same
//! field-keyed [`ValidationErrors`].

pub mod auth;
pub mod booking;
pub mod furniture;
pub mod review;
pub mod service;

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use validator::Validate;

use cm_core::services::ImageUpload;
use cm_shared::validation::ValidationErrors;

/// Convert `validator` failures into the domain's field-keyed errors
pub fn into_field_errors(errors: &validator::ValidationErrors) -> ValidationErrors {
    let mut out = ValidationErrors::new();
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    for (field, failures) in fields {
        for failure in failures {
            let message = failure
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| default_message(&failure.code));
            out.add_error(field, message, failure.code.to_string());
        }
    }
    out
}

fn default_message(code: &str) -> String {
    match code {
        "length" => "Ensure this field has a valid length.".to_string(),
        "email" => "Enter a valid email address.".to_string(),
        "range" => "Ensure this value is within the allowed range.".to_string(),
        other => format!("Invalid value ({}).", other),
    }
}

/// Run the derive checks of a request body
pub fn validated<T: Validate>(body: T) -> Result<T, ValidationErrors> {
    body.validate().map_err(|e| into_field_errors(&e))?;
    Ok(body)
}

/// Parse a choice field, recording a field error when it is not one of the
/// allowed values
pub fn parse_choice<T>(field: &str, value: &str, errors: &mut ValidationErrors) -> Option<T>
where
    T: FromStr<Err = String>,
{
    match value.trim().parse() {
        Ok(choice) => Some(choice),
        Err(message) => {
            errors.add_error(field, message, "invalid_choice");
            None
        }
    }
}

/// An image sent inline as base64
#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub file_name: Option<String>,
    /// Declared media type, e.g. `image/png`
    #[serde(default)]
    pub content_type: Option<String>,
    pub content_base64: String,
}

impl ImagePayload {
    /// Decode into an upload; `field` keys any error
    pub fn decode(&self, field: &str) -> Result<ImageUpload, ValidationErrors> {
        // Tolerate data URLs: "data:image/png;base64,...."
        let (declared, raw) = match self.content_base64.split_once(";base64,") {
            Some((header, data)) => (header.strip_prefix("data:"), data),
            None => (None, self.content_base64.as_str()),
        };
        let content_type = self
            .content_type
            .clone()
            .or_else(|| declared.map(str::to_string))
            .filter(|ct| !ct.trim().is_empty());
        let invalid = |message: &str, code: &str| {
            let mut errors = ValidationErrors::new();
            errors.add_error(field, message, code);
            errors
        };
        if raw.trim().is_empty() {
            return Err(invalid("No file was submitted.", "required"));
        }
        let bytes = STANDARD
            .decode(raw.trim())
            .map_err(|_| invalid("Upload a valid image. The content is not valid base64.", "invalid_image"))?;
        Ok(ImageUpload::new(self.file_name.clone(), bytes).with_content_type(content_type))
    }
}
