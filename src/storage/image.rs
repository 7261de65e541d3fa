use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::{LocalStorage, StorageProvider};

/// Stores uploaded images under generated `<uuid>.<ext>` names.
///
/// A namespace (the author id) puts the file into its own subdirectory of the
/// upload root. Only the generated file name is handed back; `key` rebuilds
/// the path relative to the root.
pub struct ImageStore {
    provider: Arc<dyn StorageProvider>,
}

impl ImageStore {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        tracing::debug!("Image store backed by {} storage", provider.storage_type());
        Self { provider }
    }

    /// Image store on the local filesystem rooted at `root`
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(LocalStorage::new(root)))
    }

    /// Store an in-memory payload
    pub async fn store(
        &self,
        data: Bytes,
        original_name: &str,
        namespace: Option<i64>,
    ) -> Result<String> {
        let name = generate_name(extension_of(original_name)?);
        self.provider.put(&Self::key(&name, namespace), data).await?;
        Ok(name)
    }

    /// Store a payload that has already been spooled to disk
    pub async fn store_file(
        &self,
        source: &Path,
        original_name: &str,
        namespace: Option<i64>,
    ) -> Result<String> {
        let name = generate_name(extension_of(original_name)?);
        self.provider.put_file(&Self::key(&name, namespace), source).await?;
        Ok(name)
    }

    pub async fn remove(&self, name: &str, namespace: Option<i64>) -> Result<()> {
        check_stored_name(name)?;
        self.provider.delete(&Self::key(name, namespace)).await
    }

    /// Remove every listed image, logging failures instead of returning them.
    /// Returns how many removals failed.
    pub async fn remove_all(&self, names: &[String], namespace: Option<i64>) -> usize {
        let mut failed = 0;
        for name in names {
            if let Err(e) = self.remove(name, namespace).await {
                failed += 1;
                tracing::warn!(image = %name, ?namespace, "Failed to remove image: {}", e);
            }
        }
        failed
    }

    pub async fn exists(&self, name: &str, namespace: Option<i64>) -> Result<bool> {
        check_stored_name(name)?;
        self.provider.exists(&Self::key(name, namespace)).await
    }

    /// Path of an image relative to the upload root
    pub fn key(name: &str, namespace: Option<i64>) -> String {
        match namespace {
            Some(ns) => format!("{}/{}", ns, name),
            None => name.to_string(),
        }
    }
}

/// Extension of an uploaded file name: the text after the last `.`
pub fn extension_of(original_name: &str) -> Result<&str> {
    let (_, ext) = original_name.rsplit_once('.').ok_or_else(|| {
        AppError::InvalidInput(format!("file {:?} doesn't have an extension", original_name))
    })?;

    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidInput(format!(
            "file {:?} has an unusable extension",
            original_name
        )));
    }
    Ok(ext)
}

pub fn generate_name(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), extension)
}

// Names come back from the database, so they must not escape the upload root
fn check_stored_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(AppError::InvalidInput(format!("invalid image name {:?}", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn extension_is_text_after_last_dot() {
        assert_eq!(extension_of("cat.jpg").unwrap(), "jpg");
        assert_eq!(extension_of("archive.tar.gz").unwrap(), "gz");
        assert!(matches!(extension_of("README"), Err(AppError::InvalidInput(_))));
        assert!(matches!(extension_of("trailing."), Err(AppError::InvalidInput(_))));
        assert!(matches!(extension_of("a.jpg/../../etc"), Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn generated_names_keep_extension_and_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::local(dir.path());

        let mut seen = HashSet::new();
        for _ in 0..20 {
            let name = store
                .store(Bytes::from_static(b"img"), "cat.jpg", None)
                .await
                .unwrap();
            assert!(name.ends_with(".jpg"));
            assert_ne!(name, "cat.jpg");
            assert!(seen.insert(name));
        }
    }

    #[tokio::test]
    async fn namespace_is_a_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::local(dir.path());

        let name = store
            .store(Bytes::from_static(b"img"), "dog.png", Some(5))
            .await
            .unwrap();

        assert!(dir.path().join("5").join(&name).is_file());
        assert!(!dir.path().join(&name).exists());
        assert!(store.exists(&name, Some(5)).await.unwrap());
        assert_eq!(ImageStore::key(&name, Some(5)), format!("5/{}", name));
    }

    #[tokio::test]
    async fn rejects_extensionless_upload_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::local(dir.path());

        let err = store
            .store(Bytes::from_static(b"img"), "Makefile", Some(1))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn remove_tolerates_missing_and_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::local(dir.path());

        store.remove("gone.jpg", Some(2)).await.unwrap();
        assert!(store.remove("../secret.txt", None).await.is_err());

        let failed = store
            .remove_all(&["ok.jpg".to_string(), "../x.jpg".to_string()], Some(2))
            .await;
        assert_eq!(failed, 1);
    }
}
