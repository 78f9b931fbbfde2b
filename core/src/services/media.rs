//! Uploaded images: validation and the storage seam

use async_trait::async_trait;
use uuid::Uuid;

use cm_shared::image::validate_image;

use crate::errors::DomainError;

/// Directory prefix for profile pictures
pub const PROFILE_IMAGES: &str = "profile_images";

/// Directory prefix for furniture listing photos
pub const FURNITURE_IMAGES: &str = "furniture_images";

/// Byte store for uploaded media, addressed by relative path
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Write `bytes` at `relative_path`, creating parent directories
    async fn store(&self, relative_path: &str, bytes: &[u8]) -> Result<(), DomainError>;

    /// Remove a stored file. Missing files are not an error.
    async fn remove(&self, relative_path: &str) -> Result<(), DomainError>;
}

/// A decoded upload as received from a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    /// Declared media type; must agree with the sniffed format when given
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name,
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }
}

/// Validate `upload` and write it as `{prefix}/{owner}/{uuid}.{ext}`.
///
/// Returns the relative path to store on the entity. Validation errors are
/// keyed to `field`.
pub async fn save_image(
    storage: &dyn MediaStorage,
    field: &str,
    prefix: &str,
    owner: Uuid,
    upload: &ImageUpload,
) -> Result<String, DomainError> {
    let format = validate_image(
        field,
        upload.file_name.as_deref(),
        upload.content_type.as_deref(),
        &upload.bytes,
    )?;
    let path = format!("{}/{}/{}.{}", prefix, owner, Uuid::new_v4(), format.extension());
    storage.store(&path, &upload.bytes).await?;
    tracing::debug!(path = %path, size = upload.bytes.len(), "Stored uploaded image");
    Ok(path)
}
