//! Uploaded media configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::env_or;

/// Where uploaded images are written and how they are addressed
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Filesystem root for uploaded files
    pub root: PathBuf,

    /// Public URL prefix the stored relative paths are served under
    pub base_url: String,

    /// Maximum number of images on a furniture listing
    #[serde(default = "default_max_images_per_item")]
    pub max_images_per_item: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            base_url: String::from("/media"),
            max_images_per_item: default_max_images_per_item(),
        }
    }
}

impl MediaConfig {
    /// `MEDIA_ROOT`, `MEDIA_URL` and `MEDIA_MAX_IMAGES_PER_ITEM`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            root: env_or("MEDIA_ROOT", defaults.root),
            base_url: env_or("MEDIA_URL", defaults.base_url),
            max_images_per_item: env_or("MEDIA_MAX_IMAGES_PER_ITEM", defaults.max_images_per_item),
        }
    }

    /// Public URL for a stored relative path
    pub fn url_for(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            relative_path.trim_start_matches('/')
        )
    }
}

fn default_max_images_per_item() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_single_slash() {
        let config = MediaConfig {
            base_url: "https://cdn.example.com/media/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.url_for("/profile_images/a.png"),
            "https://cdn.example.com/media/profile_images/a.png"
        );
    }
}
