use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::Result;
use crate::storage::StorageProvider;

/// Local file system storage provider
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn get_full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Hidden sibling used while the payload is still being written
    fn part_path(full_path: &Path) -> PathBuf {
        let name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        full_path.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4()))
    }

    /// Move `part` over `full_path`; the part file is dropped on failure.
    async fn commit(part: &Path, full_path: &Path) -> Result<()> {
        if let Err(e) = fs::rename(part, full_path).await {
            let _ = fs::remove_file(part).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn ensure_parent(full_path: &Path) -> Result<()> {
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let full_path = self.get_full_path(path);
        Self::ensure_parent(&full_path).await?;

        let part = Self::part_path(&full_path);
        let written: std::io::Result<()> = async {
            let mut file = fs::File::create(&part).await?;
            file.write_all(&data).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&part).await;
            return Err(e.into());
        }
        Self::commit(&part, &full_path).await?;

        tracing::debug!("Saved file to {:?}", full_path);
        Ok(())
    }

    async fn put_file(&self, path: &str, local_path: &Path) -> Result<()> {
        let full_path = self.get_full_path(path);
        Self::ensure_parent(&full_path).await?;

        // Copy next to the destination first so the final rename stays on one filesystem
        let part = Self::part_path(&full_path);
        if let Err(e) = fs::copy(local_path, &part).await {
            let _ = fs::remove_file(&part).await;
            return Err(e.into());
        }
        Self::commit(&part, &full_path).await?;

        tracing::debug!("Copied file from {:?} to {:?}", local_path, full_path);
        Ok(())
    }

    /// Removes only the file; namespace directories stay so a concurrent
    /// `put` into the same directory never finds its parent gone.
    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.get_full_path(path);

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted file {:?}", full_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.get_full_path(path)).await?)
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
