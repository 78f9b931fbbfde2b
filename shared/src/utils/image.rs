//! Uploaded image validation
//!
//! The format is decided by the file's leading bytes. A declared file name or
//! content type is checked too, but never trusted on its own.

use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

/// Largest accepted upload: 5 MiB
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }
}

/// Identify JPEG, PNG or WebP from magic bytes
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

/// Validate an uploaded image and return its detected format.
///
/// `field` is the key the error is reported under.
pub fn validate_image(
    field: &str,
    file_name: Option<&str>,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<ImageFormat, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::new(field, "The submitted file is empty.", "empty"));
    }

    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::new(
            field,
            format!(
                "Image file size cannot exceed 5MB. Current size: {:.2}MB",
                bytes.len() as f64 / (1024.0 * 1024.0)
            ),
            "image_too_large",
        ));
    }

    let invalid_format = || {
        ValidationError::new(
            field,
            "Invalid image format. Allowed formats: jpg, jpeg, png, webp",
            "invalid_image_format",
        )
    };

    let detected = sniff_format(bytes).ok_or_else(invalid_format)?;

    if let Some(name) = file_name.filter(|n| !n.is_empty()) {
        let declared = name
            .rsplit_once('.')
            .and_then(|(_, ext)| ImageFormat::from_extension(ext))
            .ok_or_else(invalid_format)?;
        if declared != detected {
            return Err(invalid_format());
        }
    }

    if let Some(ct) = content_type.filter(|c| !c.is_empty()) {
        if ImageFormat::from_content_type(ct) != Some(detected) {
            return Err(ValidationError::new(
                field,
                format!("Invalid image content type: {}", ct),
                "invalid_content_type",
            ));
        }
    }

    Ok(detected)
}
