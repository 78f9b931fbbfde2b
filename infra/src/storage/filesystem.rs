//! Media files under a root directory on local disk

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use cm_core::services::MediaStorage;
use cm_core::DomainError;

use crate::InfrastructureError;

/// Stores media below `root`, addressed by forward-slash relative paths
#[derive(Debug, Clone)]
pub struct FileSystemMediaStorage {
    root: PathBuf,
}

impl FileSystemMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative_path` below the root, refusing anything that could
    /// escape it
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(relative_path);
        let safe = !relative_path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(DomainError::internal(format!("Refusing media path {:?}", relative_path)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStorage for FileSystemMediaStorage {
    async fn store(&self, relative_path: &str, bytes: &[u8]) -> Result<(), DomainError> {
        let path = self.resolve(relative_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(InfrastructureError::from)?;
        }
        fs::write(&path, bytes).await.map_err(InfrastructureError::from)?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Media file written");
        Ok(())
    }

    async fn remove(&self, relative_path: &str) -> Result<(), DomainError> {
        let path = self.resolve(relative_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InfrastructureError::from(e).into()),
        }
    }
}
